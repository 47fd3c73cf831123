//! Limiter Effect
//!
//! Brickwall limiter that closes every session chain. This is the only
//! stage that bounds the output level.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::{db_to_linear, linear_to_db, time_to_coeff, DEFAULT_SAMPLE_RATE};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Constants
// ============================================================================

/// Minimum ceiling in dB
const MIN_CEILING_DB: f32 = -24.0;
/// Maximum ceiling in dB
const MAX_CEILING_DB: f32 = 0.0;

/// Minimum release time in ms
const MIN_RELEASE_MS: f32 = 1.0;
/// Maximum release time in ms
const MAX_RELEASE_MS: f32 = 2000.0;

/// Very fast attack time for brickwall limiting (0.1ms)
const ATTACK_MS: f32 = 0.1;

// ============================================================================
// Limiter Effect
// ============================================================================

/// Brickwall limiter effect
///
/// Gain reduction is tracked in dB with a near-instant attack and a
/// configurable release. Detection is linked across channels. A final
/// hard clip at the ceiling guarantees no sample exceeds it.
///
/// # Parameters
/// - `threshold_db`: Ceiling (-24 to 0 dB)
/// - `release_ms`: Release time for gain recovery (1 to 2000 ms)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limiter {
    params: EffectParams,
    threshold_db: f32,
    release_ms: f32,
    #[serde(skip)]
    envelope: f32,
    #[serde(skip)]
    sample_rate: f32,
    #[serde(skip)]
    ceiling_linear: f32,
    #[serde(skip)]
    attack_coeff: f32,
    #[serde(skip)]
    release_coeff: f32,
}

impl Limiter {
    /// Create a new limiter with the given ceiling and a 100 ms release
    pub fn new(threshold_db: f32) -> Self {
        let clamped = threshold_db.clamp(MIN_CEILING_DB, MAX_CEILING_DB);
        let mut limiter = Self {
            params: EffectParams::default(),
            threshold_db: clamped,
            release_ms: 100.0,
            envelope: 0.0,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            ceiling_linear: db_to_linear(clamped),
            attack_coeff: 0.0,
            release_coeff: 0.0,
        };
        limiter.update_coefficients();
        limiter
    }

    /// Build from a slot table holding `threshold_db` and `release_ms`
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        let mut limiter = Self::new(table.require("threshold_db")?);
        limiter.set_release_ms(table.require("release_ms")?);
        Ok(limiter)
    }

    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold_db = db.clamp(MIN_CEILING_DB, MAX_CEILING_DB);
        self.ceiling_linear = db_to_linear(self.threshold_db);
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Ceiling as linear amplitude
    pub fn ceiling_linear(&self) -> f32 {
        self.ceiling_linear
    }

    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.clamp(MIN_RELEASE_MS, MAX_RELEASE_MS);
        self.release_coeff = time_to_coeff(self.release_ms, self.sample_rate);
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(ATTACK_MS, self.sample_rate);
        self.release_coeff = time_to_coeff(self.release_ms, self.sample_rate);
        self.ceiling_linear = db_to_linear(self.threshold_db);
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

impl Effect for Limiter {
    impl_effect_common!(Limiter, "limiter", "Limiter");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        let num_samples = buffer.num_samples();
        if buffer.num_channels() == 0 || num_samples == 0 {
            return;
        }

        for i in 0..num_samples {
            let peak = buffer
                .samples
                .iter()
                .fold(0.0_f32, |acc, ch| acc.max(ch[i].abs()));

            let target_reduction = if peak > self.ceiling_linear {
                (linear_to_db(peak) - self.threshold_db).max(0.0)
            } else {
                0.0
            };

            let coeff = if target_reduction > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * target_reduction;

            let gain = db_to_linear(-self.envelope);
            let ceiling = self.ceiling_linear;
            for channel in buffer.samples.iter_mut() {
                let sample = channel[i] * gain;
                channel[i] = sample.clamp(-ceiling, ceiling);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "threshold_db": self.threshold_db,
            "release_ms": self.release_ms,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "threshold_db" | "ceiling_db" => {
                self.set_threshold_db(value);
                Ok(())
            }
            "release_ms" => {
                self.set_release_ms(value);
                Ok(())
            }
            _ => Err(unknown_param("limiter", name)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
