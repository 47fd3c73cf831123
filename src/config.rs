//! Configuration file
//!
//! JSON file selecting presets, overrides and seeds per session. Presets
//! themselves stay compiled in; the file only picks and adjusts them.
//!
//! ```json
//! {
//!   "sample_rate": 44100,
//!   "device": "cpu",
//!   "guitar": { "preset": "crunch", "overrides": { "delay_mix": 0.1 } },
//!   "bass": { "seed": 42 }
//! }
//! ```

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_SAMPLE_RATE;
use crate::error::{FxError, Result};
use crate::fx::{FxRack, ParameterTable, PresetChoice, SessionType};
use crate::pipeline::SessionPresets;

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_device() -> String {
    "cpu".to_string()
}

/// Settings for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Preset id; `None` uses the session default
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub overrides: ParameterTable,
    /// Randomize ranged parameters from this seed
    #[serde(default)]
    pub seed: Option<u32>,
}

impl SessionConfig {
    pub fn preset_choice(&self, session: SessionType) -> PresetChoice {
        match &self.preset {
            Some(name) => PresetChoice::Named(name.clone()),
            None => PresetChoice::default_for(session),
        }
    }

    pub fn rack(&self, session: SessionType) -> FxRack {
        FxRack::new(session)
            .with_preset(self.preset_choice(session))
            .with_overrides(self.overrides.clone())
            .with_seed(self.seed)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FxConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Device hint passed to the separator
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal: Option<SessionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guitar: Option<SessionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<SessionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synth: Option<SessionConfig>,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            device: default_device(),
            vocal: None,
            guitar: None,
            bass: None,
            synth: None,
        }
    }
}

impl FxConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FxError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }
        let content = fs::read_to_string(path)?;
        let config: FxConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings for `session`, falling back to an empty entry
    pub fn session(&self, session: SessionType) -> SessionConfig {
        let entry = match session {
            SessionType::Vocal => &self.vocal,
            SessionType::Guitar => &self.guitar,
            SessionType::Bass => &self.bass,
            SessionType::Synth => &self.synth,
        };
        entry.clone().unwrap_or_default()
    }

    /// Resolve every session once so bad keys fail before audio is touched
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FxError::config("sample_rate", "must be greater than zero"));
        }
        for session in SessionType::ALL {
            self.session(session).rack(session).resolve()?;
        }
        Ok(())
    }

    /// Per-session pipeline setup from this config
    pub fn session_presets(&self) -> SessionPresets {
        let mut presets = SessionPresets::default();
        for session in SessionType::ALL {
            let entry = self.session(session);
            presets.set(session, entry.preset_choice(session), entry.overrides, entry.seed);
        }
        presets
    }
}
