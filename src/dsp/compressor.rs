//! Compressor effect
//!
//! A feed-forward dynamics processor. Features linked peak detection, a
//! gain computer with optional soft knee, and attack/release smoothing of
//! the gain reduction.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::{db_to_linear, linear_to_db, time_to_coeff, DEFAULT_SAMPLE_RATE};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Floor for level detection in dB
const LEVEL_FLOOR_DB: f32 = -120.0;

/// Compressor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorSettings {
    /// Threshold level in dB (-60 to 0 dB)
    pub threshold_db: f32,
    /// Compression ratio (1.0 to 20.0, representing 1:1 to 20:1)
    pub ratio: f32,
    /// Attack time in milliseconds (0.1 to 200 ms)
    pub attack_ms: f32,
    /// Release time in milliseconds (5 to 2000 ms)
    pub release_ms: f32,
    /// Knee width in dB (0 = hard knee, up to 12 dB for soft knee)
    pub knee_db: f32,
    /// Makeup gain in dB (0 to 24 dB)
    pub makeup_gain_db: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            knee_db: 0.0,
            makeup_gain_db: 0.0,
        }
    }
}

impl CompressorSettings {
    /// Clamp settings to valid ranges
    pub fn clamp(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 200.0);
        self.release_ms = self.release_ms.clamp(5.0, 2000.0);
        self.knee_db = self.knee_db.clamp(0.0, 12.0);
        self.makeup_gain_db = self.makeup_gain_db.clamp(0.0, 24.0);
    }
}

/// Compressor dynamics processor
#[derive(Debug, Clone)]
pub struct Compressor {
    params: EffectParams,
    settings: CompressorSettings,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Current smoothed gain (linear, 1.0 = no reduction)
    gain: f32,
}

impl Compressor {
    pub fn new(settings: CompressorSettings) -> Self {
        let mut comp = Self {
            params: EffectParams::default(),
            settings,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            gain: 1.0,
        };
        comp.settings.clamp();
        comp.update_coefficients();
        comp
    }

    /// Build from a slot table
    ///
    /// Requires `threshold_db`, `ratio`, `attack_ms` and `release_ms`;
    /// `knee_db` and `makeup_gain_db` default to zero.
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        Ok(Self::new(CompressorSettings {
            threshold_db: table.require("threshold_db")?,
            ratio: table.require("ratio")?,
            attack_ms: table.require("attack_ms")?,
            release_ms: table.require("release_ms")?,
            knee_db: table.get_or("knee_db", 0.0),
            makeup_gain_db: table.get_or("makeup_gain_db", 0.0),
        }))
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.settings
    }

    /// Current gain reduction in dB (zero or negative)
    pub fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.gain).max(LEVEL_FLOOR_DB)
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_to_coeff(self.settings.release_ms, self.sample_rate);
    }

    /// Static gain computer: gain change in dB (zero or negative) for an input level
    pub fn compute_gain_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.settings.threshold_db;
        let ratio = self.settings.ratio;
        let knee = self.settings.knee_db;

        if knee > 0.0 {
            let knee_start = threshold - knee / 2.0;
            let knee_end = threshold + knee / 2.0;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (threshold + (input_db - threshold) / ratio) - input_db
            } else {
                // Quadratic knee: ratio eases in from 1:1
                let knee_factor = (input_db - knee_start) / knee;
                let effective_ratio = 1.0 + (ratio - 1.0) * knee_factor * knee_factor;
                let over = input_db - knee_start;
                (knee_start + over / effective_ratio) - input_db
            }
        } else if input_db <= threshold {
            0.0
        } else {
            (threshold + (input_db - threshold) / ratio) - input_db
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(CompressorSettings::default())
    }
}

impl Effect for Compressor {
    impl_effect_common!(Compressor, "compressor", "Compressor");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        let makeup = db_to_linear(self.settings.makeup_gain_db);

        for frame in 0..buffer.num_samples() {
            // Linked detection: loudest channel drives every channel
            let level = buffer
                .samples
                .iter()
                .fold(0.0_f32, |acc, ch| acc.max(ch[frame].abs()));
            let input_db = linear_to_db(level).max(LEVEL_FLOOR_DB);

            let target = db_to_linear(self.compute_gain_reduction_db(input_db));
            let coeff = if target < self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = coeff * self.gain + (1.0 - coeff) * target;

            let total_gain = self.gain * makeup;
            for channel in buffer.samples.iter_mut() {
                channel[frame] *= total_gain;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "threshold_db": self.settings.threshold_db,
            "ratio": self.settings.ratio,
            "attack_ms": self.settings.attack_ms,
            "release_ms": self.settings.release_ms,
            "knee_db": self.settings.knee_db,
            "makeup_gain_db": self.settings.makeup_gain_db,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "threshold_db" => self.settings.threshold_db = value,
            "ratio" => self.settings.ratio = value,
            "attack_ms" => self.settings.attack_ms = value,
            "release_ms" => self.settings.release_ms = value,
            "knee_db" => self.settings.knee_db = value,
            "makeup_gain_db" => self.settings.makeup_gain_db = value,
            _ => return Err(unknown_param("compressor", name)),
        }
        self.settings.clamp();
        self.update_coefficients();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp_with(threshold_db: f32, ratio: f32, knee_db: f32) -> Compressor {
        Compressor::new(CompressorSettings {
            threshold_db,
            ratio,
            knee_db,
            ..CompressorSettings::default()
        })
    }

    #[test]
    fn test_gain_computer_hard_knee() {
        let comp = comp_with(-20.0, 4.0, 0.0);
        assert_eq!(comp.compute_gain_reduction_db(-30.0), 0.0);
        // 20 dB over at 4:1 -> output 5 dB over -> 15 dB reduction
        assert!((comp.compute_gain_reduction_db(0.0) + 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_gain_computer_soft_knee_is_gentler() {
        let hard = comp_with(-20.0, 4.0, 0.0);
        let soft = comp_with(-20.0, 4.0, 10.0);
        // Just above threshold the soft knee reduces less
        let hard_gr = hard.compute_gain_reduction_db(-18.0);
        let soft_gr = soft.compute_gain_reduction_db(-18.0);
        assert!(soft_gr > hard_gr);
        // Below the knee nothing happens
        assert_eq!(soft.compute_gain_reduction_db(-26.0), 0.0);
    }

    #[test]
    fn test_process_below_threshold_is_transparent() {
        let mut comp = comp_with(-6.0, 4.0, 0.0);
        comp.prepare(44100);
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.1; 2000]; 2],
            sample_rate: 44100,
        };
        comp.process(&mut buffer);
        assert!((buffer.samples[0][1999] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_process_above_threshold_reduces_level() {
        let mut comp = comp_with(-20.0, 4.0, 0.0);
        comp.prepare(44100);
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.9; 44100]],
            sample_rate: 44100,
        };
        comp.process(&mut buffer);
        let settled = buffer.samples[0][44000];
        assert!(settled < 0.5, "expected strong reduction, got {}", settled);
        assert!(comp.gain_reduction_db() < -10.0);
    }

    #[test]
    fn test_linked_detection_ducks_quiet_channel() {
        let mut comp = comp_with(-20.0, 8.0, 0.0);
        comp.prepare(44100);
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.9; 4410], vec![0.05; 4410]],
            sample_rate: 44100,
        };
        comp.process(&mut buffer);
        assert!(buffer.samples[1][4400] < 0.05 * 0.5);
    }

    #[test]
    fn test_from_table_requires_keys() {
        let table = ParameterTable::from_pairs(&[
            ("threshold_db", -18.0),
            ("ratio", 3.5),
            ("attack_ms", 8.0),
            ("release_ms", 60.0),
        ]);
        let comp = Compressor::from_table(&table).unwrap();
        assert_eq!(comp.settings().ratio, 3.5);
        assert_eq!(comp.settings().knee_db, 0.0);

        let partial = ParameterTable::from_pairs(&[("ratio", 3.5)]);
        assert!(Compressor::from_table(&partial).is_err());
    }

    #[test]
    fn test_reset_restores_unity_gain() {
        let mut comp = comp_with(-30.0, 10.0, 0.0);
        let mut buffer = AudioBuffer {
            samples: vec![vec![1.0; 4410]],
            sample_rate: 44100,
        };
        comp.process(&mut buffer);
        assert!(comp.gain_reduction_db() < 0.0);
        comp.reset();
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }
}
