//! Distortion Effect
//!
//! `tanh` waveshaper driven by an input gain in dB, with a dry/wet mix.
//! Serves both as the vocal saturation stage and as guitar/bass drive.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum drive in dB
const MAX_DRIVE_DB: f32 = 60.0;

/// Waveshaping distortion
///
/// # Parameters
/// - `drive_db`: input gain before the shaper (0 to 60 dB)
/// - `mix`: dry/wet balance (0 = dry, 1 = wet)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distortion {
    params: EffectParams,
    drive_db: f32,
    mix: f32,
    #[serde(skip)]
    drive_linear: f32,
}

impl Distortion {
    pub fn new(drive_db: f32, mix: f32) -> Self {
        let drive_db = drive_db.clamp(0.0, MAX_DRIVE_DB);
        Self {
            params: EffectParams::default(),
            drive_db,
            mix: mix.clamp(0.0, 1.0),
            drive_linear: db_to_linear(drive_db),
        }
    }

    /// Build from a slot table holding `drive_db` and optionally `mix` (default 1)
    ///
    /// The unit is bypassed when `drive_db <= 0`.
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        let drive_db = table.require("drive_db")?;
        let mut dist = Self::new(drive_db, table.get_or("mix", 1.0));
        dist.params.enabled = drive_db > 0.0;
        Ok(dist)
    }

    pub fn set_drive_db(&mut self, drive_db: f32) {
        self.drive_db = drive_db.clamp(0.0, MAX_DRIVE_DB);
        self.drive_linear = db_to_linear(self.drive_db);
    }

    pub fn drive_db(&self) -> f32 {
        self.drive_db
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        (x * self.drive_linear).tanh()
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new(25.0, 1.0)
    }
}

impl Effect for Distortion {
    impl_effect_common!(Distortion, "distortion", "Distortion");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        let wet = self.mix;
        let dry = 1.0 - wet;
        for channel in buffer.samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = dry * *sample + wet * self.shape(*sample);
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}

    fn get_params(&self) -> Value {
        json!({
            "drive_db": self.drive_db,
            "mix": self.mix,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "drive_db" => self.set_drive_db(value),
            "mix" => self.set_mix(value),
            _ => return Err(unknown_param("distortion", name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::generate_test_tone;

    #[test]
    fn test_shaper_is_bounded() {
        let mut dist = Distortion::new(25.0, 1.0);
        let mut buffer = generate_test_tone(220.0, 0.1, 44100);
        dist.process(&mut buffer);
        assert!(buffer.peak() <= 1.0);
        // Heavily driven sine is nearly square
        assert!(buffer.peak() > 0.99);
    }

    #[test]
    fn test_mix_blends_dry() {
        let mut dist = Distortion::new(20.0, 0.5);
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.5; 4]],
            sample_rate: 44100,
        };
        dist.process(&mut buffer);
        let expected = 0.5 * 0.5 + 0.5 * (0.5_f32 * 10.0).tanh();
        assert!((buffer.samples[0][0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_zero_drive_from_table_is_bypassed() {
        let table = ParameterTable::from_pairs(&[("drive_db", 0.0)]);
        let mut dist = Distortion::from_table(&table).unwrap();
        assert!(!dist.is_enabled());

        let mut buffer = AudioBuffer {
            samples: vec![vec![0.7; 8]],
            sample_rate: 44100,
        };
        dist.process(&mut buffer);
        assert_eq!(buffer.samples[0][3], 0.7);
    }

    #[test]
    fn test_positive_drive_from_table_is_enabled() {
        let table = ParameterTable::from_pairs(&[("drive_db", 4.5), ("mix", 0.3)]);
        let dist = Distortion::from_table(&table).unwrap();
        assert!(dist.is_enabled());
        assert!((dist.mix() - 0.3).abs() < f32::EPSILON);
    }
}
