//! Buffer contract
//!
//! Converts caller arrays to the channel-first working buffer and back,
//! and adapts channel counts around units with a fixed channel need.
//!
//! Orientation rule for 2-D input: if one axis is at most
//! [`MAX_CHANNEL_AXIS`] and the other is larger, the small axis holds
//! channels. Otherwise the array is read as channel-first. Either way the
//! result must have more samples than channels.

use log::debug;

use crate::dsp::ChannelRequirement;
use crate::engine::{AudioBuffer, SampleArray};
use crate::error::{FxError, Result};

/// Largest axis length that can be read as a channel axis
pub const MAX_CHANNEL_AXIS: usize = 8;

/// Layout of the caller's array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `(T,)`; restored as `(1, T)`
    Mono1d,
    /// `(C, T)`
    ChannelFirst,
    /// `(T, C)`
    ChannelLast,
}

/// Everything needed to hand the chain output back in caller layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restore {
    pub orientation: Orientation,
    pub channels: usize,
    pub samples: usize,
}

impl Restore {
    /// Convert a processed working buffer back to the caller's orientation
    ///
    /// # Errors
    /// `Shape` if the buffer no longer matches the normalized dimensions.
    pub fn apply(&self, buffer: AudioBuffer) -> Result<SampleArray> {
        let shape = buffer.shape();
        if shape != [self.channels, self.samples] {
            return Err(FxError::shape(
                &shape,
                format!("expected ({}, {}) after processing", self.channels, self.samples),
            ));
        }

        match self.orientation {
            Orientation::Mono1d | Orientation::ChannelFirst => {
                SampleArray::from_rows(buffer.samples)
            }
            Orientation::ChannelLast => {
                let data = buffer.to_interleaved();
                SampleArray::from_shape_vec(self.samples, self.channels, data)
            }
        }
    }
}

/// Decide which axis of a 2-D shape holds channels
fn orient(rows: usize, cols: usize) -> Orientation {
    if rows <= MAX_CHANNEL_AXIS && cols > rows {
        Orientation::ChannelFirst
    } else if cols <= MAX_CHANNEL_AXIS && rows > cols {
        Orientation::ChannelLast
    } else {
        Orientation::ChannelFirst
    }
}

/// Fail unless there are more samples than channels
///
/// `shape` is the caller-facing shape reported in the error.
pub fn check_frame_count(shape: &[usize], channels: usize, samples: usize) -> Result<()> {
    if samples <= channels {
        return Err(FxError::shape(
            shape,
            format!("sample count {} must exceed channel count {}", samples, channels),
        ));
    }
    Ok(())
}

/// Normalize a caller array to a channel-first working buffer
///
/// The working buffer's sample rate is left at the default; callers set it
/// before processing.
///
/// # Errors
/// `Shape` for empty input, rank other than 1 or 2, or a result with no
/// more samples than channels.
pub fn normalize(array: &SampleArray) -> Result<(AudioBuffer, Restore)> {
    if array.is_empty() {
        return Err(FxError::shape(array.shape(), "audio buffer is empty"));
    }

    let (orientation, channels) = match *array.shape() {
        [_] => (Orientation::Mono1d, array.rows()),
        [rows, cols] => match orient(rows, cols) {
            Orientation::ChannelLast => (Orientation::ChannelLast, array.columns()),
            other => (other, array.rows()),
        },
        _ => {
            return Err(FxError::shape(array.shape(), "expected a 1-D or 2-D array"));
        }
    };

    let num_channels = channels.len();
    let num_samples = channels.first().map(Vec::len).unwrap_or(0);
    check_frame_count(array.shape(), num_channels, num_samples)?;

    debug!(
        "normalized {:?} as {:?} ({} ch x {} samples)",
        array.shape(),
        orientation,
        num_channels,
        num_samples
    );

    let buffer = AudioBuffer::from_channels(channels, crate::engine::DEFAULT_SAMPLE_RATE)?;
    Ok((
        buffer,
        Restore {
            orientation,
            channels: num_channels,
            samples: num_samples,
        },
    ))
}

/// Give a unit the channel layout it needs
///
/// Returns the adapted buffer and the original channel count for
/// [`restore_channels`]. Buffers that already fit are returned unchanged.
pub fn adapt_channels(
    buffer: &AudioBuffer,
    requirement: ChannelRequirement,
) -> (AudioBuffer, usize) {
    let original = buffer.channels();
    if requirement.accepts(original) {
        return (buffer.clone(), original);
    }

    let adapted = match requirement {
        ChannelRequirement::Any => buffer.clone(),
        ChannelRequirement::Mono => AudioBuffer {
            samples: vec![average(&buffer.samples.iter().collect::<Vec<_>>(), buffer.len())],
            sample_rate: buffer.sample_rate,
        },
        ChannelRequirement::Stereo if original == 1 => AudioBuffer {
            samples: vec![buffer.samples[0].clone(), buffer.samples[0].clone()],
            sample_rate: buffer.sample_rate,
        },
        ChannelRequirement::Stereo => {
            let even: Vec<&Vec<f32>> = buffer.samples.iter().step_by(2).collect();
            let odd: Vec<&Vec<f32>> = buffer.samples.iter().skip(1).step_by(2).collect();
            AudioBuffer {
                samples: vec![average(&even, buffer.len()), average(&odd, buffer.len())],
                sample_rate: buffer.sample_rate,
            }
        }
    };
    (adapted, original)
}

/// Return an adapted buffer to `channels` channels
pub fn restore_channels(buffer: AudioBuffer, channels: usize) -> AudioBuffer {
    let current = buffer.channels();
    if current == channels || current == 0 {
        return buffer;
    }

    let samples = match (current, channels) {
        (1, n) => vec![buffer.samples[0].clone(); n],
        (_, 1) => vec![average(&buffer.samples.iter().collect::<Vec<_>>(), buffer.len())],
        // From stereo this sends left to even channels and right to odd ones
        (m, n) => (0..n).map(|ch| buffer.samples[ch % m].clone()).collect(),
    };
    AudioBuffer {
        samples,
        sample_rate: buffer.sample_rate,
    }
}

fn average(channels: &[&Vec<f32>], len: usize) -> Vec<f32> {
    if channels.is_empty() {
        return vec![0.0; len];
    }
    let scale = 1.0 / channels.len() as f32;
    (0..len)
        .map(|i| channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32).collect()
    }

    #[test]
    fn test_mono_1d_restores_to_row() {
        let array = SampleArray::from_vec(ramp(100));
        let (buffer, restore) = normalize(&array).unwrap();
        assert_eq!(buffer.shape(), [1, 100]);
        assert_eq!(restore.orientation, Orientation::Mono1d);

        let out = restore.apply(buffer).unwrap();
        assert_eq!(out.shape(), &[1, 100]);
        assert_eq!(out.as_slice(), array.as_slice());
    }

    #[test]
    fn test_channel_last_round_trip() {
        let cf = SampleArray::from_rows(vec![ramp(50), vec![0.5; 50]]).unwrap();
        let cl = cf.transpose();
        assert_eq!(cl.shape(), &[50, 2]);

        let (buffer, restore) = normalize(&cl).unwrap();
        assert_eq!(restore.orientation, Orientation::ChannelLast);
        assert_eq!(buffer.samples[1], vec![0.5; 50]);
        assert_eq!(restore.apply(buffer).unwrap(), cl);
    }

    #[test_case(2, 100, Orientation::ChannelFirst ; "stereo channel first")]
    #[test_case(100, 2, Orientation::ChannelLast ; "stereo channel last")]
    #[test_case(6, 9, Orientation::ChannelFirst ; "surround channel first")]
    #[test_case(12, 40, Orientation::ChannelFirst ; "wide ambiguous")]
    fn test_orientation(rows: usize, cols: usize, expected: Orientation) {
        let array = SampleArray::from_shape_vec(rows, cols, vec![0.1; rows * cols]).unwrap();
        let (_, restore) = normalize(&array).unwrap();
        assert_eq!(restore.orientation, expected);
    }

    #[test_case(4, 4 ; "square")]
    #[test_case(40, 12 ; "more channels than samples")]
    #[test_case(2, 0 ; "no samples")]
    fn test_shape_errors(rows: usize, cols: usize) {
        let array = SampleArray::from_shape_vec(rows, cols, vec![0.0; rows * cols]).unwrap();
        assert!(matches!(normalize(&array), Err(FxError::Shape { .. })));
    }

    #[test]
    fn test_single_sample_mono_is_shape_error() {
        assert!(normalize(&SampleArray::from_vec(vec![0.3])).is_err());
        assert!(normalize(&SampleArray::from_vec(Vec::new())).is_err());
    }

    #[test]
    fn test_mono_to_stereo_duplicates() {
        let mono = AudioBuffer::from_channels(vec![ramp(10)], 44100).unwrap();
        let (stereo, original) = adapt_channels(&mono, ChannelRequirement::Stereo);
        assert_eq!(original, 1);
        assert_eq!(stereo.samples[0], stereo.samples[1]);

        let back = restore_channels(stereo, original);
        assert_eq!(back, mono);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let stereo = AudioBuffer::from_channels(vec![vec![1.0; 4], vec![0.0; 4]], 44100).unwrap();
        let (mono, original) = adapt_channels(&stereo, ChannelRequirement::Mono);
        assert_eq!(original, 2);
        assert_eq!(mono.samples, vec![vec![0.5; 4]]);
        assert_eq!(restore_channels(mono, 2).channels(), 2);
    }

    #[test]
    fn test_multichannel_folds_even_left_odd_right() {
        let buffer = AudioBuffer::from_channels(
            vec![vec![1.0; 4], vec![0.2; 4], vec![0.0; 4], vec![0.4; 4]],
            44100,
        )
        .unwrap();
        let (stereo, original) = adapt_channels(&buffer, ChannelRequirement::Stereo);
        assert_eq!(original, 4);
        assert_eq!(stereo.samples[0], vec![0.5; 4]);
        assert!((stereo.samples[1][0] - 0.3).abs() < 1e-6);

        let restored = restore_channels(stereo, 4);
        assert_eq!(restored.channels(), 4);
        assert_eq!(restored.samples[2], vec![0.5; 4]);
        assert!((restored.samples[3][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_matching_layout_is_untouched() {
        let stereo = AudioBuffer::from_channels(vec![ramp(8), ramp(8)], 44100).unwrap();
        let (same, original) = adapt_channels(&stereo, ChannelRequirement::Stereo);
        assert_eq!(same, stereo);
        assert_eq!(original, 2);
    }
}
