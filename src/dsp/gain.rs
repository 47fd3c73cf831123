//! Gain Effect
//!
//! Static output gain stage used at the end of the guitar and bass chains.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Minimum gain in dB (-96 dB = effectively silent)
const MIN_GAIN_DB: f32 = -96.0;

/// Maximum gain in dB (+24 dB)
const MAX_GAIN_DB: f32 = 24.0;

/// Static gain in decibels
///
/// # Parameters
/// - `gain_db`: Gain in decibels (-96 to +24 dB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gain {
    params: EffectParams,
    gain_db: f32,
    #[serde(skip)]
    gain_linear: f32,
}

impl Gain {
    /// Create a new gain stage, clamping `gain_db` to the valid range
    pub fn new(gain_db: f32) -> Self {
        let clamped = gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB);
        Self {
            params: EffectParams::default(),
            gain_db: clamped,
            gain_linear: db_to_linear(clamped),
        }
    }

    /// Build from a slot table holding `gain_db`
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        Ok(Self::new(table.require("gain_db")?))
    }

    pub fn set_gain_db(&mut self, db: f32) {
        self.gain_db = db.clamp(MIN_GAIN_DB, MAX_GAIN_DB);
        self.gain_linear = db_to_linear(self.gain_db);
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn gain_linear(&self) -> f32 {
        self.gain_linear
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Effect for Gain {
    impl_effect_common!(Gain, "gain", "Output Gain");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        // Unity gain
        if (self.gain_linear - 1.0).abs() < f32::EPSILON {
            return;
        }

        for channel in buffer.samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= self.gain_linear;
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}

    fn get_params(&self) -> Value {
        json!({
            "gain_db": self.gain_db,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "gain_db" | "gain" => {
                self.set_gain_db(value);
                Ok(())
            }
            _ => Err(unknown_param("gain", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(value: f32, num_samples: usize) -> AudioBuffer {
        AudioBuffer {
            samples: vec![vec![value; num_samples]; 2],
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_gain_clamping() {
        assert!((Gain::new(-200.0).gain_db() - MIN_GAIN_DB).abs() < f32::EPSILON);
        assert!((Gain::new(50.0).gain_db() - MAX_GAIN_DB).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gain_process_minus_six() {
        let mut gain = Gain::new(-6.0206);
        let mut buffer = create_test_buffer(0.8, 64);
        gain.process(&mut buffer);
        assert!((buffer.samples[1][10] - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_gain_bypass() {
        let mut gain = Gain::new(-12.0);
        gain.set_enabled(false);
        let mut buffer = create_test_buffer(0.5, 16);
        gain.process(&mut buffer);
        assert_eq!(buffer.samples[0][0], 0.5);
    }

    #[test]
    fn test_gain_from_table() {
        let table = ParameterTable::from_pairs(&[("gain_db", -3.0)]);
        let gain = Gain::from_table(&table).unwrap();
        assert!((gain.gain_db() + 3.0).abs() < f32::EPSILON);
        assert!(Gain::from_table(&ParameterTable::new()).is_err());
    }

    #[test]
    fn test_set_param_unknown() {
        let mut gain = Gain::default();
        assert!(gain.set_param("gain_db", 3.0).is_ok());
        assert!(gain.set_param("ratio", 3.0).is_err());
    }
}
