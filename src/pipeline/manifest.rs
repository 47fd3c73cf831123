//! Run manifest
//!
//! Written next to pipeline output: when the run happened, on which device,
//! and a SHA-256 of every file it produced.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One produced file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the output directory
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub stemfx_version: String,
    pub input: String,
    pub device: String,
    pub separator: String,
    pub sample_rate: u32,
    pub files: Vec<ManifestEntry>,
    #[serde(default)]
    pub failures: Vec<String>,
}

impl RunManifest {
    pub fn new(input: &Path, device: &str, separator: &str, sample_rate: u32) -> Self {
        Self {
            created_at: Utc::now(),
            stemfx_version: env!("CARGO_PKG_VERSION").to_string(),
            input: input.display().to_string(),
            device: device.to_string(),
            separator: separator.to_string(),
            sample_rate,
            files: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Hash `path` and record it relative to `root`
    pub fn add_file(&mut self, root: &Path, path: &Path) -> Result<()> {
        let content = fs::read(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.files.push(ManifestEntry {
            path: relative.display().to_string(),
            sha256: format!("{:x}", Sha256::digest(&content)),
            size_bytes: content.len() as u64,
        });
        Ok(())
    }

    /// Write as `manifest.json` in `dir`
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_hash_is_recorded() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("sub").join("a.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"abc").unwrap();

        let mut manifest = RunManifest::new(Path::new("mix.wav"), "cpu", "passthrough", 44100);
        manifest.add_file(dir.path(), &file).unwrap();

        let entry = &manifest.files[0];
        assert_eq!(entry.path, Path::new("sub").join("a.txt").display().to_string());
        assert_eq!(
            entry.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(entry.size_bytes, 3);
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let manifest = RunManifest::new(Path::new("mix.wav"), "cuda", "bridge", 44100);
        let path = manifest.write(dir.path()).unwrap();
        let loaded = RunManifest::load(&path).unwrap();
        assert_eq!(loaded.device, "cuda");
        assert_eq!(loaded.created_at, manifest.created_at);
    }
}
