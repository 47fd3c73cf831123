//! Biquad filter sections
//!
//! Coefficients follow the RBJ Audio EQ Cookbook and are computed in f64.
//! A [`BiquadSection`] carries one set of coefficients plus per-channel
//! state, so filters and EQ bands can be cascaded freely.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::DEFAULT_SAMPLE_RATE;

/// Butterworth Q for a single 2-pole section
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Biquad response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Bell curve boost/cut
    #[default]
    Peak,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
    /// Remove above frequency
    LowPass,
    /// Remove below frequency
    HighPass,
}

/// Normalized coefficients: H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Identity
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        let freq = frequency.clamp(10.0, sample_rate * 0.49);
        let q = q.clamp(0.1, 20.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + k),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - k),
                    (a + 1.0) + (a - 1.0) * cos_w0 + k,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - k,
                )
            }
            FilterType::HighShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + k),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - k),
                    (a + 1.0) - (a - 1.0) * cos_w0 + k,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - k,
                )
            }
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Filter history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// One biquad stage with its design parameters and per-channel state
#[derive(Debug, Clone)]
pub struct BiquadSection {
    pub filter_type: FilterType,
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl BiquadSection {
    pub fn new(filter_type: FilterType, frequency: f32, gain_db: f32, q: f32) -> Self {
        let mut section = Self {
            filter_type,
            frequency,
            gain_db,
            q,
            coeffs: BiquadCoeffs::default(),
            states: Vec::new(),
        };
        section.design(DEFAULT_SAMPLE_RATE);
        section
    }

    /// Recompute coefficients for `sample_rate`
    pub fn design(&mut self, sample_rate: u32) {
        self.coeffs = BiquadCoeffs::calculate(
            self.filter_type,
            sample_rate as f64,
            self.frequency as f64,
            self.gain_db as f64,
            self.q as f64,
        );
    }

    /// Filter one channel in place
    pub fn process_channel(&mut self, channel: usize, samples: &mut [f32]) {
        if self.states.len() <= channel {
            self.states.resize(channel + 1, BiquadState::default());
        }
        let state = &mut self.states[channel];
        for sample in samples.iter_mut() {
            *sample = state.process(*sample as f64, &self.coeffs) as f32;
        }
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f32, sample_rate: u32) -> f32 {
        let c = &self.coeffs;
        let w = 2.0 * PI * frequency as f64 / sample_rate as f64;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = c.b0 + c.b1 * cos1 + c.b2 * cos2;
        let num_im = -(c.b1 * sin1 + c.b2 * sin2);
        let den_re = 1.0 + c.a1 * cos1 + c.a2 * cos2;
        let den_im = -(c.a1 * sin1 + c.a2 * sin2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        (20.0 * (num / den).log10()) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coeffs_are_identity() {
        let mut state = BiquadState::default();
        let c = BiquadCoeffs::default();
        assert_eq!(state.process(0.3, &c), 0.3);
    }

    #[test]
    fn test_peak_gain_at_center() {
        let section = BiquadSection::new(FilterType::Peak, 1000.0, 6.0, 1.0);
        assert!((section.magnitude_db(1000.0, 44100) - 6.0).abs() < 0.05);
    }

    #[test]
    fn test_highpass_response() {
        let mut section = BiquadSection::new(FilterType::HighPass, 1000.0, 0.0, BUTTERWORTH_Q);
        section.design(44100);
        assert!((section.magnitude_db(1000.0, 44100) + 3.01).abs() < 0.1);
        assert!(section.magnitude_db(100.0, 44100) < -35.0);
        assert!(section.magnitude_db(10000.0, 44100).abs() < 0.1);
    }

    #[test]
    fn test_shelves() {
        let low = BiquadSection::new(FilterType::LowShelf, 200.0, 6.0, BUTTERWORTH_Q);
        assert!((low.magnitude_db(20.0, 44100) - 6.0).abs() < 0.2);
        let high = BiquadSection::new(FilterType::HighShelf, 5000.0, -6.0, BUTTERWORTH_Q);
        assert!((high.magnitude_db(20000.0, 44100) + 6.0).abs() < 0.5);
    }
}
