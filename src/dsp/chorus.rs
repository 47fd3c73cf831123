//! Chorus Effect
//!
//! Modulated fractional delay per channel. The right channel's LFO runs a
//! quarter cycle ahead of the left one, so the unit works on stereo only.

use std::f32::consts::PI;

use crate::dsp::effect::{unknown_param, ChannelRequirement, Effect, EffectParams};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TWO_PI: f32 = 2.0 * PI;

/// Feedback is kept strictly inside the unit circle
const MAX_FEEDBACK: f32 = 0.95;

/// Chorus parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChorusSettings {
    /// LFO rate in Hz
    pub rate_hz: f32,
    /// Modulation depth as a fraction of the centre delay (0 to 1)
    pub depth: f32,
    /// Centre delay in ms
    pub centre_delay_ms: f32,
    /// Feedback amount (-0.95 to 0.95)
    pub feedback: f32,
    /// Dry/wet balance (0 to 1)
    pub mix: f32,
}

impl Default for ChorusSettings {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            depth: 0.25,
            centre_delay_ms: 7.0,
            feedback: 0.0,
            mix: 0.5,
        }
    }
}

impl ChorusSettings {
    pub fn clamp(&mut self) {
        self.rate_hz = self.rate_hz.clamp(0.01, 20.0);
        self.depth = self.depth.clamp(0.0, 1.0);
        self.centre_delay_ms = self.centre_delay_ms.clamp(0.5, 50.0);
        self.feedback = self.feedback.clamp(-MAX_FEEDBACK, MAX_FEEDBACK);
        self.mix = self.mix.clamp(0.0, 1.0);
    }
}

/// Delay line for one channel
#[derive(Debug, Clone, Default)]
struct ChorusLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl ChorusLine {
    fn resize(&mut self, len: usize) {
        self.buffer = vec![0.0; len.max(4)];
        self.write_pos = 0;
    }

    /// Linear-interpolated read `delay` samples behind the write head
    #[inline]
    fn read(&self, delay: f32) -> f32 {
        let size = self.buffer.len();
        let mut pos = self.write_pos as f32 - delay;
        if pos < 0.0 {
            pos += size as f32;
        }
        let idx = pos as usize;
        let frac = pos - idx as f32;
        let a = self.buffer[idx % size];
        let b = self.buffer[(idx + 1) % size];
        a * (1.0 - frac) + b * frac
    }

    #[inline]
    fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }
}

/// Stereo chorus
#[derive(Debug, Clone)]
pub struct Chorus {
    params: EffectParams,
    settings: ChorusSettings,
    sample_rate: f32,
    lines: [ChorusLine; 2],
    /// LFO phase in radians
    phase: f32,
}

impl Chorus {
    pub fn new(settings: ChorusSettings) -> Self {
        let mut chorus = Self {
            params: EffectParams::default(),
            settings,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            lines: [ChorusLine::default(), ChorusLine::default()],
            phase: 0.0,
        };
        chorus.settings.clamp();
        chorus.allocate();
        chorus
    }

    /// Build from a slot table holding `rate_hz`, `depth`, `centre_delay_ms`,
    /// `feedback` and `mix`
    ///
    /// The unit is bypassed when `mix <= 0`.
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        let mix = table.require("mix")?;
        let mut chorus = Self::new(ChorusSettings {
            rate_hz: table.require("rate_hz")?,
            depth: table.require("depth")?,
            centre_delay_ms: table.require("centre_delay_ms")?,
            feedback: table.require("feedback")?,
            mix,
        });
        chorus.params.enabled = mix > 0.0;
        Ok(chorus)
    }

    pub fn settings(&self) -> &ChorusSettings {
        &self.settings
    }

    /// Size both lines for the longest possible delay
    fn allocate(&mut self) {
        let max_delay_ms = self.settings.centre_delay_ms * (1.0 + self.settings.depth);
        let len = (max_delay_ms * 0.001 * self.sample_rate) as usize + 4;
        self.lines.iter_mut().for_each(|line| line.resize(len));
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new(ChorusSettings::default())
    }
}

impl Effect for Chorus {
    impl_effect_common!(Chorus, "chorus", "Chorus");

    fn channel_requirement(&self) -> ChannelRequirement {
        ChannelRequirement::Stereo
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled || buffer.num_channels() != 2 {
            return;
        }

        let centre = self.settings.centre_delay_ms * 0.001 * self.sample_rate;
        let swing = centre * self.settings.depth;
        let phase_inc = TWO_PI * self.settings.rate_hz / self.sample_rate;
        let feedback = self.settings.feedback;
        let wet = self.settings.mix;
        let dry = 1.0 - wet;

        for i in 0..buffer.num_samples() {
            for (ch, line) in self.lines.iter_mut().enumerate() {
                let lfo = (self.phase + ch as f32 * PI / 2.0).sin();
                let delayed = line.read(centre + swing * lfo);
                let input = buffer.samples[ch][i];
                line.write(input + feedback * delayed);
                buffer.samples[ch][i] = dry * input + wet * delayed;
            }
            self.phase = (self.phase + phase_inc) % TWO_PI;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.allocate();
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.allocate();
    }

    fn get_params(&self) -> Value {
        json!({
            "rate_hz": self.settings.rate_hz,
            "depth": self.settings.depth,
            "centre_delay_ms": self.settings.centre_delay_ms,
            "feedback": self.settings.feedback,
            "mix": self.settings.mix,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "rate_hz" => self.settings.rate_hz = value,
            "depth" => self.settings.depth = value,
            "centre_delay_ms" => self.settings.centre_delay_ms = value,
            "feedback" => self.settings.feedback = value,
            "mix" => self.settings.mix = value,
            _ => return Err(unknown_param("chorus", name)),
        }
        self.settings.clamp();
        self.allocate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::generate_stereo_test_tone;

    fn chorus_table(mix: f32) -> ParameterTable {
        ParameterTable::from_pairs(&[
            ("rate_hz", 1.0),
            ("depth", 0.25),
            ("centre_delay_ms", 7.0),
            ("feedback", 0.0),
            ("mix", mix),
        ])
    }

    #[test]
    fn test_chorus_requires_stereo() {
        assert_eq!(Chorus::default().channel_requirement(), ChannelRequirement::Stereo);
    }

    #[test]
    fn test_zero_mix_is_bypassed() {
        let chorus = Chorus::from_table(&chorus_table(0.0)).unwrap();
        assert!(!chorus.is_enabled());
        assert!(Chorus::from_table(&chorus_table(0.3)).unwrap().is_enabled());
    }

    #[test]
    fn test_chorus_preserves_shape_and_stays_finite() {
        let mut chorus = Chorus::from_table(&chorus_table(0.5)).unwrap();
        chorus.prepare(44100);
        let mut buffer = generate_stereo_test_tone(440.0, 660.0, 0.25, 44100);
        let original = buffer.clone();
        chorus.process(&mut buffer);

        assert_eq!(buffer.shape(), original.shape());
        assert!(buffer.is_finite());
        assert!(buffer.peak() <= 1.0 + 1e-4);
        assert_ne!(buffer, original);
    }

    #[test]
    fn test_channels_are_decorrelated() {
        let mut chorus = Chorus::from_table(&chorus_table(1.0)).unwrap();
        chorus.prepare(44100);
        let mut buffer = generate_stereo_test_tone(440.0, 440.0, 0.25, 44100);
        chorus.process(&mut buffer);
        let diff: f32 = buffer.samples[0]
            .iter()
            .zip(&buffer.samples[1])
            .map(|(l, r)| (l - r).abs())
            .sum();
        assert!(diff > 1.0);
    }

    #[test]
    fn test_delay_line_interpolates() {
        let mut line = ChorusLine::default();
        line.resize(8);
        line.write(0.0);
        line.write(1.0);
        // Write head sits at 2; half a sample between the two writes
        assert!((line.read(1.5) - 0.5).abs() < 1e-6);
    }
}
