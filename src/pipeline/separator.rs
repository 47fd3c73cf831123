//! Separation collaborator
//!
//! A [`Separator`] splits a mixture into the four pipeline stems. The
//! engine only relies on the stem contract checked by [`validate_stem`]:
//! at least one channel, more samples than channels, finite values and the
//! separator's fixed sample rate.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::engine::{load_audio, resample, AudioBuffer, DEFAULT_SAMPLE_RATE};
use crate::error::{FxError, Result};
use crate::pipeline::stem::{Stem, StemMap};

/// Source separation backend
pub trait Separator: Send + Sync {
    /// Split `mixture` into stems
    fn separate(&self, mixture: &AudioBuffer) -> Result<StemMap>;

    /// Rate the separator works at and returns stems in
    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    fn name(&self) -> &str;
}

/// Gives every stem a copy of the mixture
///
/// Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct PassthroughSeparator;

impl Separator for PassthroughSeparator {
    fn separate(&self, mixture: &AudioBuffer) -> Result<StemMap> {
        Ok(Stem::ALL.iter().map(|&stem| (stem, mixture.clone())).collect())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Loads `{dir}/{stem}.wav` written by an external separation run
///
/// Stems without a file, or whose file cannot be decoded, are left out
/// of the map.
#[derive(Debug, Clone)]
pub struct DirectorySeparator {
    dir: PathBuf,
}

impl DirectorySeparator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn stem_path(&self, stem: Stem) -> PathBuf {
        self.dir.join(format!("{}.wav", stem))
    }
}

impl Separator for DirectorySeparator {
    fn separate(&self, _mixture: &AudioBuffer) -> Result<StemMap> {
        if !self.dir.is_dir() {
            return Err(FxError::FileNotFound {
                path: self.dir.display().to_string(),
                source: None,
            });
        }

        let mut stems = StemMap::new();
        for stem in Stem::ALL {
            let path = self.stem_path(stem);
            if !path.exists() {
                warn!("no {} stem at {}", stem, path.display());
                continue;
            }
            match load_audio(&path, self.sample_rate()) {
                Ok(buffer) => {
                    stems.insert(stem, buffer);
                }
                Err(e) => warn!("skipping {} stem at {}: {}", stem, path.display(), e),
            }
        }
        Ok(stems)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Check one stem against the separation contract
pub fn validate_stem(stem: Stem, buffer: &AudioBuffer, sample_rate: u32) -> Result<()> {
    let fail = |reason: String| {
        Err(FxError::Separation {
            stem: stem.to_string(),
            reason,
        })
    };

    if buffer.channels() == 0 || buffer.is_empty() {
        return fail("stem is empty".to_string());
    }
    if buffer.len() <= buffer.channels() {
        return fail(format!(
            "{} samples is not more than {} channels",
            buffer.len(),
            buffer.channels()
        ));
    }
    if !buffer.is_finite() {
        return fail("stem contains NaN or Inf".to_string());
    }
    if buffer.sample_rate != sample_rate {
        return fail(format!("sample rate {} != {}", buffer.sample_rate, sample_rate));
    }
    Ok(())
}

/// Check a full stem map: all four stems present and each valid
pub fn validate_stems(stems: &StemMap, sample_rate: u32) -> Result<()> {
    for stem in Stem::ALL {
        match stems.get(&stem) {
            Some(buffer) => validate_stem(stem, buffer, sample_rate)?,
            None => {
                return Err(FxError::Separation {
                    stem: stem.to_string(),
                    reason: "stem missing from separation output".to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Repair what can be repaired, then validate
///
/// A wrong sample rate is resampled and a mono stem is duplicated to
/// stereo. Empty or non-finite stems stay errors.
pub fn conform_stem(stem: Stem, buffer: &AudioBuffer, sample_rate: u32) -> Result<AudioBuffer> {
    let mut out = if buffer.sample_rate != sample_rate && !buffer.is_empty() {
        debug!("resampling {} stem {} -> {} Hz", stem, buffer.sample_rate, sample_rate);
        resample(buffer, sample_rate)
    } else {
        buffer.clone()
    };

    if out.channels() == 1 {
        warn!("{} stem is mono, duplicating to stereo", stem);
        let mono = out.samples[0].clone();
        out.samples.push(mono);
    }

    validate_stem(stem, &out, sample_rate)?;
    Ok(out)
}

/// Path of a stem file inside a separation output directory
pub fn stem_file(dir: &Path, stem: Stem) -> PathBuf {
    dir.join(format!("{}.wav", stem))
}
