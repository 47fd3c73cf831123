//! Instrument sessions and their slot layouts
//!
//! A session fixes the order of effect slots. Order is part of the
//! contract: changing a parameter never moves a slot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};

/// Instrument category a chain is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Vocal,
    Guitar,
    Bass,
    Synth,
}

impl SessionType {
    pub const ALL: [SessionType; 4] = [
        SessionType::Vocal,
        SessionType::Guitar,
        SessionType::Bass,
        SessionType::Synth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Vocal => "vocal",
            SessionType::Guitar => "guitar",
            SessionType::Bass => "bass",
            SessionType::Synth => "synth",
        }
    }

    /// Effect slots in processing order
    pub fn slots(&self) -> &'static [SlotKind] {
        use SlotKind::*;
        match self {
            SessionType::Vocal => &[
                Gate, HighPass, DeEsser, Compressor, VocalEq, Saturation, Reverb, Limiter,
            ],
            SessionType::Guitar => &[
                Gate, ToneFilter, Compressor, Distortion, Chorus, Delay, Reverb, OutputGain,
                Limiter,
            ],
            SessionType::Bass => &[
                Gate, Compressor, Distortion, BassEq, Chorus, OutputGain, Limiter,
            ],
            SessionType::Synth => &[Gate, HighPass, Compressor, SynthEq, Chorus, Reverb, Limiter],
        }
    }

    /// Every full parameter key a slot of this session requires
    pub fn required_keys(&self) -> Vec<String> {
        self.slots()
            .iter()
            .flat_map(|slot| {
                slot.required_keys()
                    .iter()
                    .map(move |k| format!("{}{}", slot.prefix(), k))
            })
            .collect()
    }

    /// Whether any slot reads `key`
    pub fn accepts_key(&self, key: &str) -> bool {
        self.slots().iter().any(|slot| slot.accepts_key(key))
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vocal" | "vocals" => Ok(SessionType::Vocal),
            "guitar" => Ok(SessionType::Guitar),
            "bass" => Ok(SessionType::Bass),
            "synth" | "piano" | "keys" => Ok(SessionType::Synth),
            other => Err(FxError::config(
                "session",
                format!("invalid session type '{}' (expected vocal, guitar, bass or synth)", other),
            )),
        }
    }
}

/// One position in a session chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Gate,
    HighPass,
    DeEsser,
    ToneFilter,
    Compressor,
    VocalEq,
    BassEq,
    SynthEq,
    Saturation,
    Distortion,
    Chorus,
    Delay,
    Reverb,
    OutputGain,
    Limiter,
}

impl SlotKind {
    pub fn name(&self) -> &'static str {
        match self {
            SlotKind::Gate => "gate",
            SlotKind::HighPass => "highpass",
            SlotKind::DeEsser => "deesser",
            SlotKind::ToneFilter => "tone_filter",
            SlotKind::Compressor => "compressor",
            SlotKind::VocalEq | SlotKind::BassEq | SlotKind::SynthEq => "eq",
            SlotKind::Saturation => "saturation",
            SlotKind::Distortion => "distortion",
            SlotKind::Chorus => "chorus",
            SlotKind::Delay => "delay",
            SlotKind::Reverb => "reverb",
            SlotKind::OutputGain => "output_gain",
            SlotKind::Limiter => "limiter",
        }
    }

    /// Prefix shared by this slot's keys in a session table
    pub fn prefix(&self) -> &'static str {
        match self {
            SlotKind::Gate => "gate_",
            SlotKind::HighPass => "highpass_",
            SlotKind::DeEsser => "deesser_",
            SlotKind::ToneFilter => "tone_",
            SlotKind::Compressor => "comp_",
            SlotKind::VocalEq | SlotKind::SynthEq => "eq_",
            SlotKind::BassEq | SlotKind::Distortion => "",
            SlotKind::Saturation => "saturation_",
            SlotKind::Chorus => "chorus_",
            SlotKind::Delay => "delay_",
            SlotKind::Reverb => "reverb_",
            SlotKind::OutputGain => "output_",
            SlotKind::Limiter => "limiter_",
        }
    }

    /// Keys (without prefix) that must resolve for the slot to build
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            SlotKind::Gate | SlotKind::Compressor => {
                &["threshold_db", "ratio", "attack_ms", "release_ms"]
            }
            SlotKind::HighPass => &["cutoff_hz"],
            SlotKind::DeEsser => &["freq_hz", "cut_db", "q"],
            SlotKind::ToneFilter => &["low_cut_hz", "high_cut_hz"],
            SlotKind::VocalEq => &[
                "presence_freq_hz",
                "presence_gain_db",
                "presence_q",
                "air_freq_hz",
                "air_gain_db",
                "air_q",
            ],
            SlotKind::BassEq => &[
                "low_shelf_freq_hz",
                "low_shelf_gain_db",
                "mid_scoop_freq_hz",
                "mid_scoop_gain_db",
                "mid_scoop_q",
            ],
            SlotKind::SynthEq => &[
                "low_freq_hz",
                "low_gain_db",
                "low_q",
                "mid_freq_hz",
                "mid_gain_db",
                "mid_q",
                "high_freq_hz",
                "high_gain_db",
                "high_q",
            ],
            SlotKind::Saturation => &["drive_db", "mix"],
            SlotKind::Distortion => &["drive_db"],
            SlotKind::Chorus => &["rate_hz", "depth", "centre_delay_ms", "feedback", "mix"],
            SlotKind::Delay => &["seconds", "feedback", "mix"],
            SlotKind::Reverb => &["room_size", "damping", "wet_level", "dry_level", "width"],
            SlotKind::OutputGain => &["gain_db"],
            SlotKind::Limiter => &["threshold_db", "release_ms"],
        }
    }

    /// Keys (without prefix) the slot reads when present
    pub fn optional_keys(&self) -> &'static [&'static str] {
        match self {
            SlotKind::Compressor => &["knee_db", "makeup_gain_db"],
            SlotKind::Reverb => &["pre_delay_ms", "freeze_mode"],
            _ => &[],
        }
    }

    /// Whether `key` (with prefix) belongs to this slot
    pub fn accepts_key(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix()).is_some_and(|rest| {
            self.required_keys().contains(&rest) || self.optional_keys().contains(&rest)
        })
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("vocal", SessionType::Vocal)]
    #[test_case("Vocals", SessionType::Vocal)]
    #[test_case("guitar", SessionType::Guitar)]
    #[test_case("bass", SessionType::Bass)]
    #[test_case("synth", SessionType::Synth)]
    #[test_case("piano", SessionType::Synth)]
    #[test_case("keys", SessionType::Synth)]
    fn test_parse_session(input: &str, expected: SessionType) {
        assert_eq!(input.parse::<SessionType>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_session_is_configuration_error() {
        let err = "drums".parse::<SessionType>().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("drums"));
    }

    #[test]
    fn test_vocal_slot_order() {
        let names: Vec<&str> = SessionType::Vocal.slots().iter().map(SlotKind::name).collect();
        assert_eq!(
            names,
            vec![
                "gate",
                "highpass",
                "deesser",
                "compressor",
                "eq",
                "saturation",
                "reverb",
                "limiter",
            ]
        );
    }

    #[test]
    fn test_every_session_ends_with_limiter() {
        for session in SessionType::ALL {
            assert_eq!(session.slots().last(), Some(&SlotKind::Limiter), "{}", session);
        }
    }

    #[test]
    fn test_accepts_key() {
        assert!(SessionType::Vocal.accepts_key("comp_threshold_db"));
        assert!(SessionType::Vocal.accepts_key("reverb_pre_delay_ms"));
        assert!(!SessionType::Vocal.accepts_key("drive_db"));
        assert!(SessionType::Guitar.accepts_key("drive_db"));
        assert!(SessionType::Bass.accepts_key("mid_scoop_q"));
        assert!(!SessionType::Bass.accepts_key("delay_mix"));
    }

    #[test]
    fn test_required_keys_are_prefixed() {
        let keys = SessionType::Guitar.required_keys();
        assert!(keys.contains(&"tone_low_cut_hz".to_string()));
        assert!(keys.contains(&"delay_seconds".to_string()));
        assert!(keys.contains(&"output_gain_db".to_string()));
    }
}
