//! Audio Buffer Management
//!
//! Provides the channel-first working buffer that every effect chain
//! processes, plus level helpers shared by the DSP units.

use num_traits::Float;

use crate::error::{FxError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate the whole system runs at (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// Generic so biquad design (f64) and per-sample gain (f32) share it.
#[inline]
pub fn db_to_linear<T: Float>(db: T) -> T {
    let ten = T::from(10.0).unwrap_or_else(T::one);
    let twenty = T::from(20.0).unwrap_or_else(T::one);
    ten.powf(db / twenty)
}

/// Convert linear amplitude to decibels
///
/// Returns negative infinity for zero or negative input.
#[inline]
pub fn linear_to_db<T: Float>(linear: T) -> T {
    if linear <= T::zero() {
        T::neg_infinity()
    } else {
        let twenty = T::from(20.0).unwrap_or_else(T::one);
        twenty * linear.log10()
    }
}

/// Time constant in milliseconds to a one-pole smoothing coefficient
#[inline]
pub fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = (time_ms * sample_rate / 1000.0).max(1e-3);
    (-1.0 / samples).exp()
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Working audio buffer for all effect processing
///
/// Stores audio as non-interleaved 32-bit floating point samples in
/// channel-first order: `samples[channel][frame]`. Any channel count of
/// one or more is allowed; effect units that need a specific layout get
/// one through the contract layer's channel fallback.
///
/// # Example
/// ```
/// use stemfx::engine::buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
///
/// let buffer = AudioBuffer::new(DEFAULT_SAMPLE_RATE as usize, ChannelLayout::Stereo);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz (default: 44100)
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with the given number of samples and layout
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        Self::silent(layout.num_channels(), num_samples, DEFAULT_SAMPLE_RATE)
    }

    /// Create a silent buffer with an arbitrary channel count
    pub fn silent(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// `Shape` if there are no channels or channel lengths differ.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(FxError::shape(&[0], "buffer has no channels"));
        };
        let len = first.len();
        if let Some(bad) = channels.iter().find(|ch| ch.len() != len) {
            return Err(FxError::shape(
                &[channels.len(), len],
                format!("channel lengths differ ({} vs {})", len, bad.len()),
            ));
        }
        Ok(Self {
            samples: channels,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Errors
    /// `InvalidAudio` if the data length is not a multiple of the channel count.
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(FxError::InvalidAudio {
                reason: "channel count must be at least 1".to_string(),
                source: None,
            });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(FxError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Alias for channels()
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias for len()
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.len()
    }

    /// Shape as `[channels, samples]`
    pub fn shape(&self) -> [usize; 2] {
        [self.channels(), self.len()]
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Check if all samples are finite (not NaN or Infinity)
    ///
    /// Used for DSP overflow detection.
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Absolute peak across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, ChannelLayout::Stereo)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0_f32) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206_f32) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0_f64) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(0.1_f32) - (-20.0)).abs() < 1e-4);
        let zero = linear_to_db(0.0_f32);
        assert!(zero.is_infinite() && zero.is_sign_negative());
    }

    #[test]
    fn test_time_to_coeff_is_stable_for_zero_time() {
        let coeff = time_to_coeff(0.0, 44100.0);
        assert!(coeff.is_finite());
        assert!((0.0..1.0).contains(&coeff));
    }

    #[test]
    fn test_from_channels_rejects_ragged() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(matches!(result, Err(FxError::Shape { .. })));
    }

    #[test]
    fn test_from_channels_rejects_empty() {
        let result = AudioBuffer::from_channels(vec![], 44100);
        assert!(matches!(result, Err(FxError::Shape { .. })));
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();
        assert_eq!(buffer.samples[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(buffer.samples[1], vec![-1.0, -2.0, -3.0]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_bad_length() {
        let result = AudioBuffer::from_interleaved(&[0.0; 5], 2, 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_finite_detects_nan() {
        let mut buffer = AudioBuffer::new(8, ChannelLayout::Stereo);
        assert!(buffer.is_finite());
        buffer.samples[1][2] = f32::NAN;
        assert!(!buffer.is_finite());
    }

    #[test]
    fn test_peak_spans_channels() {
        let buffer = create_test_buffer(vec![vec![0.1, -0.2], vec![0.3, -0.7]]);
        assert!((buffer.peak() - 0.7).abs() < f32::EPSILON);
    }
}
