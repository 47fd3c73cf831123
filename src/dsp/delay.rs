//! Delay Effect
//!
//! Feedback echo with a dry/wet mix, one circular buffer per channel.

use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Longest supported delay
const MAX_DELAY_SECONDS: f32 = 4.0;

/// Feedback ceiling (1.0 would never decay)
const MAX_FEEDBACK: f32 = 0.95;

/// Feedback delay
///
/// # Parameters
/// - `delay_seconds`: echo time (1 ms to 4 s)
/// - `feedback`: amount of each echo fed back (0 to 0.95)
/// - `mix`: dry/wet balance (0 to 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delay {
    params: EffectParams,
    delay_seconds: f32,
    feedback: f32,
    mix: f32,
    #[serde(skip)]
    lines: Vec<Vec<f32>>,
    #[serde(skip)]
    write_pos: usize,
    #[serde(skip)]
    sample_rate: f32,
}

impl Delay {
    pub fn new(delay_seconds: f32, feedback: f32, mix: f32) -> Self {
        Self {
            params: EffectParams::default(),
            delay_seconds: delay_seconds.clamp(0.001, MAX_DELAY_SECONDS),
            feedback: feedback.clamp(0.0, MAX_FEEDBACK),
            mix: mix.clamp(0.0, 1.0),
            lines: Vec::new(),
            write_pos: 0,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
        }
    }

    /// Build from a slot table holding `seconds`, `feedback` and `mix`
    ///
    /// The unit is bypassed when `mix <= 0`.
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        let mix = table.require("mix")?;
        let mut delay = Self::new(table.require("seconds")?, table.require("feedback")?, mix);
        delay.params.enabled = mix > 0.0;
        Ok(delay)
    }

    pub fn delay_seconds(&self) -> f32 {
        self.delay_seconds
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    fn delay_samples(&self) -> usize {
        ((self.delay_seconds * self.sample_rate) as usize).max(1)
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(0.5, 0.2, 0.3)
    }
}

impl Effect for Delay {
    impl_effect_common!(Delay, "delay", "Delay");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }

        let size = self.delay_samples();
        if self.lines.len() != buffer.num_channels() || self.lines.iter().any(|l| l.len() != size) {
            self.lines = vec![vec![0.0; size]; buffer.num_channels()];
            self.write_pos = 0;
        }

        let wet = self.mix;
        let dry = 1.0 - wet;
        for i in 0..buffer.num_samples() {
            for (line, channel) in self.lines.iter_mut().zip(buffer.samples.iter_mut()) {
                // The slot about to be overwritten is exactly `size` samples old
                let echo = line[self.write_pos];
                let input = channel[i];
                line[self.write_pos] = input + self.feedback * echo;
                channel[i] = dry * input + wet * echo;
            }
            self.write_pos = (self.write_pos + 1) % size;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.lines.clear();
        self.write_pos = 0;
    }

    fn reset(&mut self) {
        self.lines.clear();
        self.write_pos = 0;
    }

    fn get_params(&self) -> Value {
        json!({
            "delay_seconds": self.delay_seconds,
            "feedback": self.feedback,
            "mix": self.mix,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "delay_seconds" | "seconds" => {
                self.delay_seconds = value.clamp(0.001, MAX_DELAY_SECONDS)
            }
            "feedback" => self.feedback = value.clamp(0.0, MAX_FEEDBACK),
            "mix" => self.mix = value.clamp(0.0, 1.0),
            _ => return Err(unknown_param("delay", name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(num_samples: usize) -> AudioBuffer {
        let mut samples = vec![0.0; num_samples];
        samples[0] = 1.0;
        AudioBuffer {
            samples: vec![samples.clone(), samples],
            sample_rate: 1000,
        }
    }

    #[test]
    fn test_delay_produces_echoes() {
        let mut delay = Delay::new(0.1, 0.5, 0.5);
        delay.prepare(1000);
        let mut buffer = impulse(400);
        delay.process(&mut buffer);

        assert!((buffer.samples[0][0] - 0.5).abs() < 1e-6);
        assert!((buffer.samples[0][100] - 0.5).abs() < 1e-6);
        assert!((buffer.samples[0][200] - 0.25).abs() < 1e-6);
        assert!((buffer.samples[1][300] - 0.125).abs() < 1e-6);
        assert_eq!(buffer.samples[0][50], 0.0);
    }

    #[test]
    fn test_delay_state_carries_across_blocks() {
        let mut delay = Delay::new(0.1, 0.0, 1.0);
        delay.prepare(1000);
        let mut first = impulse(60);
        delay.process(&mut first);
        let mut second = AudioBuffer {
            samples: vec![vec![0.0; 60]; 2],
            sample_rate: 1000,
        };
        delay.process(&mut second);
        assert!((second.samples[0][40] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_mix_is_bypassed() {
        let table =
            ParameterTable::from_pairs(&[("seconds", 0.5), ("feedback", 0.2), ("mix", 0.0)]);
        assert!(!Delay::from_table(&table).unwrap().is_enabled());
    }

    #[test]
    fn test_feedback_clamped() {
        let delay = Delay::new(0.5, 2.0, 0.3);
        assert!((delay.feedback() - MAX_FEEDBACK).abs() < f32::EPSILON);
    }
}
