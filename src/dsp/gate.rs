//! Noise Gate effect
//!
//! A downward expander: audio below the threshold is attenuated by
//! `ratio` dB per dB under the threshold. Detection is linked across
//! channels so the stereo image never shifts.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::{db_to_linear, linear_to_db, time_to_coeff, DEFAULT_SAMPLE_RATE};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum attenuation the gate applies
const RANGE_DB: f32 = -80.0;

/// Release of the level detector, independent of the gain release
const DETECTOR_RELEASE_MS: f32 = 10.0;

/// Gate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    /// Threshold in dB (-100 to 0)
    pub threshold_db: f32,
    /// Expansion ratio (1 = off, higher = harder gate)
    pub ratio: f32,
    /// Time to open, in ms
    pub attack_ms: f32,
    /// Time to close, in ms
    pub release_ms: f32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            ratio: 10.0,
            attack_ms: 1.0,
            release_ms: 100.0,
        }
    }
}

impl GateSettings {
    pub fn clamp(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-100.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 100.0);
        self.attack_ms = self.attack_ms.clamp(0.01, 500.0);
        self.release_ms = self.release_ms.clamp(1.0, 5000.0);
    }
}

/// Noise gate (downward expander)
#[derive(Debug, Clone)]
pub struct Gate {
    params: EffectParams,
    settings: GateSettings,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    detector_coeff: f32,
    /// Detected level (linear)
    level: f32,
    /// Smoothed gain (linear)
    gain: f32,
}

impl Gate {
    pub fn new(settings: GateSettings) -> Self {
        let mut gate = Self {
            params: EffectParams::default(),
            settings,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            detector_coeff: 0.0,
            level: 0.0,
            gain: 1.0,
        };
        gate.settings.clamp();
        gate.update_coefficients();
        gate
    }

    /// Build from a slot table holding `threshold_db`, `ratio`, `attack_ms`, `release_ms`
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        Ok(Self::new(GateSettings {
            threshold_db: table.require("threshold_db")?,
            ratio: table.require("ratio")?,
            attack_ms: table.require("attack_ms")?,
            release_ms: table.require("release_ms")?,
        }))
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_to_coeff(self.settings.release_ms, self.sample_rate);
        self.detector_coeff = time_to_coeff(DETECTOR_RELEASE_MS, self.sample_rate);
    }

    /// Static gain in dB for a detected level in dB
    fn compute_gain_db(&self, level_db: f32) -> f32 {
        if level_db >= self.settings.threshold_db {
            0.0
        } else {
            ((level_db - self.settings.threshold_db) * (self.settings.ratio - 1.0)).max(RANGE_DB)
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(GateSettings::default())
    }
}

impl Effect for Gate {
    impl_effect_common!(Gate, "gate", "Noise Gate");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        for frame in 0..buffer.num_samples() {
            let peak = buffer
                .samples
                .iter()
                .fold(0.0_f32, |acc, ch| acc.max(ch[frame].abs()));

            // Instant-attack peak detector
            self.level = if peak > self.level {
                peak
            } else {
                self.detector_coeff * self.level + (1.0 - self.detector_coeff) * peak
            };

            let target = db_to_linear(self.compute_gain_db(linear_to_db(self.level).max(-200.0)));
            let coeff = if target > self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = coeff * self.gain + (1.0 - coeff) * target;

            for channel in buffer.samples.iter_mut() {
                channel[frame] *= self.gain;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.level = 0.0;
        self.gain = 1.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "threshold_db": self.settings.threshold_db,
            "ratio": self.settings.ratio,
            "attack_ms": self.settings.attack_ms,
            "release_ms": self.settings.release_ms,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "threshold_db" => self.settings.threshold_db = value,
            "ratio" => self.settings.ratio = value,
            "attack_ms" => self.settings.attack_ms = value,
            "release_ms" => self.settings.release_ms = value,
            _ => return Err(unknown_param("gate", name)),
        }
        self.settings.clamp();
        self.update_coefficients();
        Ok(())
    }
}
