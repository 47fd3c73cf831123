//! Stem names and their sessions

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::fx::SessionType;

/// Separated stems keyed by name
pub type StemMap = BTreeMap<Stem, AudioBuffer>;

/// One of the four stems the pipeline processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Guitar,
    Bass,
    Piano,
}

impl Stem {
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Guitar, Stem::Bass, Stem::Piano];

    /// File and map key for this stem
    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Guitar => "guitar",
            Stem::Bass => "bass",
            Stem::Piano => "piano",
        }
    }

    /// Session whose chain processes this stem
    pub fn session(&self) -> SessionType {
        match self {
            Stem::Vocals => SessionType::Vocal,
            Stem::Guitar => SessionType::Guitar,
            Stem::Bass => SessionType::Bass,
            Stem::Piano => SessionType::Synth,
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stem {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        Stem::ALL
            .iter()
            .copied()
            .find(|stem| stem.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| FxError::config("stem", format!("unknown stem '{}'", s)))
    }
}
