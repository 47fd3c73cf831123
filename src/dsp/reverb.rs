//! Reverb effect
//!
//! Freeverb: per side, 8 parallel lowpass-feedback comb filters into 4
//! series allpass filters. The right side's delays are offset by the
//! stereo spread. A pre-delay line sits in front of the tank and freeze
//! mode holds the tail indefinitely.

use crate::dsp::effect::{unknown_param, ChannelRequirement, Effect, EffectParams};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::fx::params::ParameterTable;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Sample rate the tuning delays are specified at
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Right channel delay offset in samples
const STEREO_SPREAD: usize = 23;

const ALLPASS_GAIN: f32 = 0.5;
const FIXED_INPUT_GAIN: f32 = 0.015;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;

const MAX_PRE_DELAY_MS: f32 = 500.0;

// ============================================================================
// Settings
// ============================================================================

/// Reverb parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbSettings {
    /// Room size: 0 (tiny) to 1 (huge hall)
    pub room_size: f32,
    /// Damping: 0 (bright) to 1 (dark)
    pub damping: f32,
    /// Wet signal level: 0 to 1
    pub wet_level: f32,
    /// Dry signal level: 0 to 1
    pub dry_level: f32,
    /// Stereo width: 0 (mono) to 1 (full stereo)
    pub width: f32,
    /// Pre-delay in milliseconds
    pub pre_delay_ms: f32,
    /// Freeze when >= 0.5
    pub freeze_mode: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 0.4,
            width: 1.0,
            pre_delay_ms: 0.0,
            freeze_mode: 0.0,
        }
    }
}

impl ReverbSettings {
    pub fn clamp(&mut self) {
        self.room_size = self.room_size.clamp(0.0, 1.0);
        self.damping = self.damping.clamp(0.0, 1.0);
        self.wet_level = self.wet_level.clamp(0.0, 1.0);
        self.dry_level = self.dry_level.clamp(0.0, 1.0);
        self.width = self.width.clamp(0.0, 1.0);
        self.pre_delay_ms = self.pre_delay_ms.clamp(0.0, MAX_PRE_DELAY_MS);
        self.freeze_mode = self.freeze_mode.clamp(0.0, 1.0);
    }

    fn frozen(&self) -> bool {
        self.freeze_mode >= 0.5
    }
}

// ============================================================================
// Filter Components
// ============================================================================

/// Power-of-two circular delay line
#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
    delay: usize,
}

impl DelayLine {
    fn new(delay: usize) -> Self {
        let delay = delay.max(1);
        let size = (delay + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
            delay,
        }
    }

    #[inline]
    fn read(&self) -> f32 {
        self.buffer[(self.write_pos + self.mask + 1 - self.delay) & self.mask]
    }

    #[inline]
    fn push(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) & self.mask;
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Lowpass-feedback comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    line: DelayLine,
    filter_state: f32,
}

impl CombFilter {
    fn new(delay: usize) -> Self {
        Self {
            line: DelayLine::new(delay),
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.line.read();
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.line.push(input + self.filter_state * feedback);
        output
    }

    fn clear(&mut self) {
        self.line.clear();
        self.filter_state = 0.0;
    }
}

/// Schroeder allpass used for diffusion
#[derive(Debug, Clone)]
struct AllpassFilter {
    line: DelayLine,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        Self {
            line: DelayLine::new(delay),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read();
        let output = delayed - input;
        self.line.push(input + delayed * ALLPASS_GAIN);
        output
    }
}

/// One side of the tank
#[derive(Debug, Clone)]
struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Tank {
    fn new(sample_rate: f64, spread: usize) -> Self {
        let scale = sample_rate / REFERENCE_SAMPLE_RATE;
        let scaled = |d: usize| (((d + spread) as f64) * scale) as usize;
        Self {
            combs: COMB_DELAYS.iter().map(|&d| CombFilter::new(scaled(d))).collect(),
            allpasses: ALLPASS_DELAYS.iter().map(|&d| AllpassFilter::new(scaled(d))).collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let mut out = self
            .combs
            .iter_mut()
            .map(|c| c.process(input, feedback, damp))
            .sum::<f32>();
        for allpass in self.allpasses.iter_mut() {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(|a| a.line.clear());
    }
}

// ============================================================================
// Main Reverb Effect
// ============================================================================

/// Stereo Freeverb
#[derive(Debug, Clone)]
pub struct Reverb {
    params: EffectParams,
    settings: ReverbSettings,
    sample_rate: u32,
    left: Tank,
    right: Tank,
    pre_delay: DelayLine,
}

impl Reverb {
    pub fn new(settings: ReverbSettings) -> Self {
        let mut reverb = Self {
            params: EffectParams::default(),
            settings,
            sample_rate: DEFAULT_SAMPLE_RATE,
            left: Tank::new(REFERENCE_SAMPLE_RATE, 0),
            right: Tank::new(REFERENCE_SAMPLE_RATE, STEREO_SPREAD),
            pre_delay: DelayLine::new(1),
        };
        reverb.settings.clamp();
        reverb.rebuild();
        reverb
    }

    /// Build from a slot table
    ///
    /// Requires `room_size`, `damping`, `wet_level`, `dry_level`, `width`;
    /// `pre_delay_ms` and `freeze_mode` default to zero.
    pub fn from_table(table: &ParameterTable) -> Result<Self> {
        Ok(Self::new(ReverbSettings {
            room_size: table.require("room_size")?,
            damping: table.require("damping")?,
            wet_level: table.require("wet_level")?,
            dry_level: table.require("dry_level")?,
            width: table.require("width")?,
            pre_delay_ms: table.get_or("pre_delay_ms", 0.0),
            freeze_mode: table.get_or("freeze_mode", 0.0),
        }))
    }

    pub fn settings(&self) -> &ReverbSettings {
        &self.settings
    }

    /// Reallocate delay lines for the current sample rate and pre-delay
    fn rebuild(&mut self) {
        let sr = self.sample_rate as f64;
        self.left = Tank::new(sr, 0);
        self.right = Tank::new(sr, STEREO_SPREAD);
        let pre_delay_samples = (self.settings.pre_delay_ms as f64 * 0.001 * sr) as usize;
        self.pre_delay = DelayLine::new(pre_delay_samples);
    }

    /// Feedback, damping and input gain, honouring freeze
    fn tank_coefficients(&self) -> (f32, f32, f32) {
        if self.settings.frozen() {
            (1.0, 0.0, 0.0)
        } else {
            (
                self.settings.room_size * ROOM_SCALE + ROOM_OFFSET,
                self.settings.damping * DAMP_SCALE,
                FIXED_INPUT_GAIN,
            )
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(ReverbSettings::default())
    }
}

impl Effect for Reverb {
    impl_effect_common!(Reverb, "reverb", "Reverb");

    fn channel_requirement(&self) -> ChannelRequirement {
        ChannelRequirement::Stereo
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled || buffer.num_channels() != 2 {
            return;
        }

        let (feedback, damp, input_gain) = self.tank_coefficients();
        let wet = self.settings.wet_level * WET_SCALE;
        let wet1 = 0.5 * wet * (1.0 + self.settings.width);
        let wet2 = 0.5 * wet * (1.0 - self.settings.width);
        let dry = self.settings.dry_level * DRY_SCALE;
        let use_pre_delay = self.settings.pre_delay_ms > 0.0;

        let (left, right) = buffer.samples.split_at_mut(1);
        for (l, r) in left[0].iter_mut().zip(right[0].iter_mut()) {
            let mut input = (*l + *r) * input_gain;
            if use_pre_delay {
                let delayed = self.pre_delay.read();
                self.pre_delay.push(input);
                input = delayed;
            }

            let out_l = self.left.process(input, feedback, damp);
            let out_r = self.right.process(input, feedback, damp);

            *l = *l * dry + out_l * wet1 + out_r * wet2;
            *r = *r * dry + out_r * wet1 + out_l * wet2;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.rebuild();
        }
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.pre_delay.clear();
    }

    fn get_params(&self) -> Value {
        json!({
            "room_size": self.settings.room_size,
            "damping": self.settings.damping,
            "wet_level": self.settings.wet_level,
            "dry_level": self.settings.dry_level,
            "width": self.settings.width,
            "pre_delay_ms": self.settings.pre_delay_ms,
            "freeze_mode": self.settings.freeze_mode,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            "room_size" => self.settings.room_size = value,
            "damping" => self.settings.damping = value,
            "wet_level" => self.settings.wet_level = value,
            "dry_level" => self.settings.dry_level = value,
            "width" => self.settings.width = value,
            "pre_delay_ms" => {
                self.settings.pre_delay_ms = value;
                self.settings.clamp();
                self.rebuild();
                return Ok(());
            }
            "freeze_mode" => self.settings.freeze_mode = value,
            _ => return Err(unknown_param("reverb", name)),
        }
        self.settings.clamp();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
