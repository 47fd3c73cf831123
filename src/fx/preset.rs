//! Built-in presets
//!
//! Each session has a closed set of presets. A preset is a small table of
//! changes layered over the session defaults. All tables here are
//! immutable constant data.

use std::fmt;

use serde::Serialize;

use crate::fx::params::{ParameterTable, RangeTable};
use crate::fx::session::SessionType;

/// Revision of the built-in preset tables
///
/// Bumped whenever a default or preset value changes, so recorded chain
/// settings can tell which tables produced them.
pub const PRESET_VERSION: u32 = 1;

const VOCAL_DEFAULTS: &[(&str, f32)] = &[
    ("gate_threshold_db", -60.0),
    ("gate_ratio", 10.0),
    ("gate_attack_ms", 5.0),
    ("gate_release_ms", 50.0),
    ("highpass_cutoff_hz", 90.0),
    ("deesser_freq_hz", 6000.0),
    ("deesser_cut_db", -4.0),
    ("deesser_q", 3.0),
    ("comp_threshold_db", -18.0),
    ("comp_ratio", 3.5),
    ("comp_attack_ms", 8.0),
    ("comp_release_ms", 60.0),
    ("eq_presence_freq_hz", 3000.0),
    ("eq_presence_gain_db", 12.0),
    ("eq_presence_q", 1.0),
    ("eq_air_freq_hz", 10000.0),
    ("eq_air_gain_db", 12.0),
    ("eq_air_q", 0.7),
    ("saturation_drive_db", 4.5),
    ("saturation_mix", 0.3),
    ("reverb_room_size", 0.28),
    ("reverb_damping", 0.5),
    ("reverb_wet_level", 0.2),
    ("reverb_dry_level", 0.8),
    ("reverb_width", 1.0),
    ("reverb_pre_delay_ms", 20.0),
    ("reverb_freeze_mode", 0.0),
    ("limiter_threshold_db", -1.0),
    ("limiter_release_ms", 100.0),
];

const GUITAR_DEFAULTS: &[(&str, f32)] = &[
    ("gate_threshold_db", -50.0),
    ("gate_ratio", 10.0),
    ("gate_attack_ms", 1.0),
    ("gate_release_ms", 100.0),
    ("tone_low_cut_hz", 80.0),
    ("tone_high_cut_hz", 6000.0),
    ("comp_threshold_db", -15.0),
    ("comp_ratio", 4.0),
    ("comp_attack_ms", 5.0),
    ("comp_release_ms", 50.0),
    ("drive_db", 25.0),
    ("chorus_rate_hz", 1.0),
    ("chorus_depth", 0.25),
    ("chorus_centre_delay_ms", 7.0),
    ("chorus_feedback", 0.0),
    ("chorus_mix", 0.3),
    ("delay_seconds", 0.5),
    ("delay_feedback", 0.2),
    ("delay_mix", 0.3),
    ("reverb_room_size", 0.5),
    ("reverb_damping", 0.5),
    ("reverb_wet_level", 0.33),
    ("reverb_dry_level", 0.4),
    ("reverb_width", 1.0),
    ("output_gain_db", 0.0),
    ("limiter_threshold_db", -1.0),
    ("limiter_release_ms", 100.0),
];

const BASS_DEFAULTS: &[(&str, f32)] = &[
    ("gate_threshold_db", -55.0),
    ("gate_ratio", 10.0),
    ("gate_attack_ms", 1.0),
    ("gate_release_ms", 100.0),
    ("comp_threshold_db", -20.0),
    ("comp_ratio", 4.0),
    ("comp_attack_ms", 20.0),
    ("comp_release_ms", 100.0),
    ("drive_db", 8.0),
    ("low_shelf_freq_hz", 80.0),
    ("low_shelf_gain_db", 2.0),
    ("mid_scoop_freq_hz", 400.0),
    ("mid_scoop_gain_db", -3.0),
    ("mid_scoop_q", 1.5),
    ("chorus_rate_hz", 0.5),
    ("chorus_depth", 0.15),
    ("chorus_centre_delay_ms", 7.0),
    ("chorus_feedback", 0.0),
    ("chorus_mix", 0.3),
    ("output_gain_db", 0.0),
    ("limiter_threshold_db", -0.5),
    ("limiter_release_ms", 100.0),
];

const SYNTH_DEFAULTS: &[(&str, f32)] = &[
    ("gate_threshold_db", -60.0),
    ("gate_ratio", 10.0),
    ("gate_attack_ms", 1.0),
    ("gate_release_ms", 100.0),
    ("highpass_cutoff_hz", 80.0),
    ("comp_threshold_db", -20.0),
    ("comp_ratio", 3.0),
    ("comp_attack_ms", 5.0),
    ("comp_release_ms", 50.0),
    ("eq_low_freq_hz", 200.0),
    ("eq_low_gain_db", 0.0),
    ("eq_low_q", 0.707),
    ("eq_mid_freq_hz", 1500.0),
    ("eq_mid_gain_db", 2.0),
    ("eq_mid_q", 1.0),
    ("eq_high_freq_hz", 8000.0),
    ("eq_high_gain_db", 1.0),
    ("eq_high_q", 0.707),
    ("chorus_rate_hz", 0.8),
    ("chorus_depth", 0.25),
    ("chorus_centre_delay_ms", 7.0),
    ("chorus_feedback", 0.0),
    ("chorus_mix", 0.3),
    ("reverb_room_size", 0.35),
    ("reverb_damping", 0.5),
    ("reverb_wet_level", 0.25),
    ("reverb_dry_level", 0.8),
    ("reverb_width", 1.0),
    ("limiter_threshold_db", -1.0),
    ("limiter_release_ms", 100.0),
];

const VOCAL_RANGES: &[(&str, f32, f32)] = &[
    ("comp_threshold_db", -24.0, -12.0),
    ("reverb_room_size", 0.2, 0.5),
    ("saturation_drive_db", 3.0, 6.0),
    ("reverb_wet_level", 0.15, 0.3),
    ("eq_presence_gain_db", 8.0, 14.0),
    ("eq_air_gain_db", 8.0, 14.0),
];

const GUITAR_RANGES: &[(&str, f32, f32)] = &[
    ("drive_db", 0.0, 30.0),
    ("gate_threshold_db", -60.0, -40.0),
    ("comp_threshold_db", -25.0, -10.0),
    ("chorus_mix", 0.0, 0.4),
    ("delay_mix", 0.0, 0.35),
    ("reverb_room_size", 0.3, 0.7),
    ("reverb_wet_level", 0.15, 0.4),
];

const BASS_RANGES: &[(&str, f32, f32)] = &[
    ("drive_db", 0.0, 15.0),
    ("comp_ratio", 3.0, 6.0),
    ("low_shelf_gain_db", 0.0, 4.0),
    ("mid_scoop_gain_db", -6.0, -1.0),
    ("chorus_mix", 0.0, 0.4),
    ("chorus_depth", 0.1, 0.3),
    ("comp_threshold_db", -25.0, -15.0),
];

const SYNTH_RANGES: &[(&str, f32, f32)] = &[
    ("gate_threshold_db", -70.0, -50.0),
    ("comp_ratio", 2.0, 5.0),
    ("comp_threshold_db", -30.0, -10.0),
    ("eq_mid_gain_db", 0.0, 4.0),
    ("chorus_mix", 0.2, 0.5),
    ("reverb_room_size", 0.2, 0.5),
    ("reverb_wet_level", 0.15, 0.35),
];

/// Default parameter table for a session
pub fn defaults(session: SessionType) -> ParameterTable {
    ParameterTable::from_pairs(match session {
        SessionType::Vocal => VOCAL_DEFAULTS,
        SessionType::Guitar => GUITAR_DEFAULTS,
        SessionType::Bass => BASS_DEFAULTS,
        SessionType::Synth => SYNTH_DEFAULTS,
    })
}

/// Randomization ranges for a session
pub fn ranges(session: SessionType) -> RangeTable {
    RangeTable::from_pairs(match session {
        SessionType::Vocal => VOCAL_RANGES,
        SessionType::Guitar => GUITAR_RANGES,
        SessionType::Bass => BASS_RANGES,
        SessionType::Synth => SYNTH_RANGES,
    })
}

/// Generates a closed preset enum with id parsing and a change table
macro_rules! session_presets {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident {
            $($variant:ident => $id:literal : [$(($key:literal, $value:expr)),* $(,)?]),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn id(&self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }

            /// Case-insensitive lookup by preset id
            pub fn parse(name: &str) -> Option<Self> {
                let name = name.trim().to_lowercase();
                Self::ALL.iter().copied().find(|p| p.id() == name)
            }

            /// Changes this preset applies over the session defaults
            pub fn changes(&self) -> ParameterTable {
                match self {
                    $($name::$variant => ParameterTable::from_pairs(&[$(($key, $value)),*])),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }
    };
}

session_presets! {
    /// Vocal presets
    VocalPreset, default = Default {
        Default => "default": [],
        Bright => "bright": [
            ("eq_presence_gain_db", 10.0),
            ("eq_air_gain_db", 14.0),
            ("highpass_cutoff_hz", 100.0),
        ],
        Warm => "warm": [
            ("eq_presence_gain_db", 6.0),
            ("eq_air_gain_db", 6.0),
            ("highpass_cutoff_hz", 70.0),
            ("saturation_drive_db", 3.0),
        ],
        Roomy => "roomy": [
            ("reverb_room_size", 0.4),
            ("reverb_wet_level", 0.28),
        ],
    }
}

session_presets! {
    /// Guitar presets
    GuitarPreset, default = Clean {
        Clean => "clean": [
            ("drive_db", 0.0),
            ("chorus_mix", 0.25),
            ("delay_mix", 0.2),
            ("reverb_wet_level", 0.25),
        ],
        Crunch => "crunch": [
            ("drive_db", 12.0),
            ("chorus_mix", 0.1),
            ("delay_mix", 0.15),
            ("reverb_wet_level", 0.2),
        ],
        Distortion => "distortion": [
            ("drive_db", 25.0),
            ("gate_threshold_db", -40.0),
            ("chorus_mix", 0.0),
            ("delay_mix", 0.25),
            ("reverb_wet_level", 0.2),
            ("output_gain_db", -3.0),
        ],
    }
}

session_presets! {
    /// Bass presets
    BassPreset, default = Default {
        Default => "default": [],
        Vintage => "vintage": [
            ("drive_db", 12.0),
            ("low_shelf_gain_db", 3.5),
            ("mid_scoop_gain_db", -1.0),
            ("chorus_mix", 0.0),
            ("comp_attack_ms", 35.0),
        ],
        Modern => "modern": [
            ("drive_db", 6.0),
            ("low_shelf_gain_db", 2.0),
            ("mid_scoop_gain_db", -5.0),
            ("chorus_mix", 0.25),
            ("comp_ratio", 6.0),
        ],
        Fuzz => "fuzz": [
            ("drive_db", 22.0),
            ("gate_threshold_db", -40.0),
            ("mid_scoop_gain_db", 0.0),
            ("comp_threshold_db", -25.0),
        ],
    }
}

session_presets! {
    /// Synth, piano and keys presets
    SynthPreset, default = Default {
        Default => "default": [],
        Bright => "bright": [
            ("eq_mid_gain_db", 3.0),
            ("eq_high_gain_db", 2.5),
            ("chorus_mix", 0.4),
        ],
        Warm => "warm": [
            ("eq_low_gain_db", 1.5),
            ("eq_mid_gain_db", 1.0),
            ("eq_high_gain_db", -1.0),
            ("reverb_damping", 0.7),
        ],
        Spacious => "spacious": [
            ("chorus_mix", 0.5),
            ("chorus_depth", 0.4),
            ("reverb_room_size", 0.6),
            ("reverb_wet_level", 0.4),
            ("reverb_width", 1.0),
        ],
        Tight => "tight": [
            ("comp_threshold_db", -25.0),
            ("comp_ratio", 5.0),
            ("reverb_room_size", 0.2),
            ("reverb_wet_level", 0.15),
            ("chorus_mix", 0.2),
        ],
    }
}

/// A preset of any session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Preset {
    Vocal(VocalPreset),
    Guitar(GuitarPreset),
    Bass(BassPreset),
    Synth(SynthPreset),
}

impl Preset {
    /// Look up a preset id within a session; `None` if unregistered
    pub fn parse(session: SessionType, name: &str) -> Option<Self> {
        match session {
            SessionType::Vocal => VocalPreset::parse(name).map(Preset::Vocal),
            SessionType::Guitar => GuitarPreset::parse(name).map(Preset::Guitar),
            SessionType::Bass => BassPreset::parse(name).map(Preset::Bass),
            SessionType::Synth => SynthPreset::parse(name).map(Preset::Synth),
        }
    }

    /// The session's designated default preset
    pub fn default_for(session: SessionType) -> Self {
        match session {
            SessionType::Vocal => Preset::Vocal(VocalPreset::default()),
            SessionType::Guitar => Preset::Guitar(GuitarPreset::default()),
            SessionType::Bass => Preset::Bass(BassPreset::default()),
            SessionType::Synth => Preset::Synth(SynthPreset::default()),
        }
    }

    /// Every preset registered for a session
    pub fn all(session: SessionType) -> Vec<Self> {
        match session {
            SessionType::Vocal => VocalPreset::ALL.iter().copied().map(Preset::Vocal).collect(),
            SessionType::Guitar => GuitarPreset::ALL.iter().copied().map(Preset::Guitar).collect(),
            SessionType::Bass => BassPreset::ALL.iter().copied().map(Preset::Bass).collect(),
            SessionType::Synth => SynthPreset::ALL.iter().copied().map(Preset::Synth).collect(),
        }
    }

    pub fn session(&self) -> SessionType {
        match self {
            Preset::Vocal(_) => SessionType::Vocal,
            Preset::Guitar(_) => SessionType::Guitar,
            Preset::Bass(_) => SessionType::Bass,
            Preset::Synth(_) => SessionType::Synth,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Preset::Vocal(p) => p.id(),
            Preset::Guitar(p) => p.id(),
            Preset::Bass(p) => p.id(),
            Preset::Synth(p) => p.id(),
        }
    }

    pub fn changes(&self) -> ParameterTable {
        match self {
            Preset::Vocal(p) => p.changes(),
            Preset::Guitar(p) => p.changes(),
            Preset::Bass(p) => p.changes(),
            Preset::Synth(p) => p.changes(),
        }
    }

    /// Session defaults with this preset's changes applied
    pub fn table(&self) -> ParameterTable {
        defaults(self.session()).merged(&self.changes())
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
