//! Audio file I/O for StemFX
//!
//! Reads and writes WAV files through hound. Everything is converted to
//! 32-bit float on load and resampled to the requested rate (44.1kHz for
//! the whole pipeline). Resampling is linear interpolation.

use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::Serialize;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{FxError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 is written as float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 16 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 32-bit float, lossless for the working format
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Header information for an audio file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
    pub bits_per_sample: u16,
    pub duration_secs: f64,
}

/// Read header information without decoding samples
pub fn audio_info(path: &Path) -> Result<AudioInfo> {
    let reader = open_reader(path)?;
    let spec = reader.spec();
    let frames = reader.duration();
    Ok(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames,
        bits_per_sample: spec.bits_per_sample,
        duration_secs: frames as f64 / spec.sample_rate.max(1) as f64,
    })
}

/// Load an audio file as a channel-first buffer at `target_rate`
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the sample format cannot be decoded
/// * `EmptyAudio` - If the file holds no samples
pub fn load_audio(path: &Path, target_rate: u32) -> Result<AudioBuffer> {
    let reader = open_reader(path)?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(FxError::InvalidAudio {
            reason: "WAV header declares zero channels".to_string(),
            source: None,
        });
    }

    let samples_f32 = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples_f32.len() < channels {
        return Err(FxError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&samples_f32, channels, spec.sample_rate)?;

    log::debug!(
        "Loaded {} ({} ch, {} Hz, {} frames)",
        path.display(),
        channels,
        spec.sample_rate,
        buffer.len()
    );

    Ok(resample(&buffer, target_rate))
}

/// Save a buffer as WAV at the buffer's own sample rate
///
/// Parent directories are created when missing.
pub fn save_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    if buffer.is_empty() {
        return Err(FxError::EmptyAudio);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let interleaved = buffer.to_interleaved();
    let mut writer = WavWriter::create(path, spec)?;

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled)?;
            }
        }
        32 => {
            for sample in interleaved {
                writer.write_sample(sample)?;
            }
        }
        _ => {
            return Err(FxError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
            });
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Resample every channel to `target_rate`
///
/// Returns a clone when the rates already match.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    if buffer.sample_rate == target_rate || buffer.sample_rate == 0 {
        return AudioBuffer {
            samples: buffer.samples.clone(),
            sample_rate: target_rate,
        };
    }

    let ratio = target_rate as f64 / buffer.sample_rate as f64;
    log::debug!("Resampling {} Hz -> {} Hz", buffer.sample_rate, target_rate);

    AudioBuffer {
        samples: buffer
            .samples
            .iter()
            .map(|channel| resample_linear(channel, ratio))
            .collect(),
        sample_rate: target_rate,
    }
}

/// Generate a mono sine test tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono);
    buffer.sample_rate = sample_rate;

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer {
        samples: vec![left.samples[0].clone(), right.samples[0].clone()],
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn open_reader(path: &Path) -> Result<WavReader<std::io::BufReader<fs::File>>> {
    if !path.exists() {
        return Err(FxError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    WavReader::open(path).map_err(|e| FxError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    })
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decode_err = |e: hound::Error| FxError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, bits) => Err(FxError::UnsupportedFormat {
            format: format!("{}-bit integer audio", bits),
        }),
    }
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round().max(1.0) as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else {
            samples[source_len - 1]
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
    use tempfile::tempdir;

    #[test]
    fn test_generate_test_tone() {
        let buffer = generate_test_tone(441.0, 1.0, DEFAULT_SAMPLE_RATE);
        assert_eq!(buffer.num_samples(), 44100);
        assert_eq!(buffer.num_channels(), 1);
        // 100 samples per cycle: half a cycle in is a zero crossing
        assert!(buffer.samples[0][50].abs() < 1e-3);
    }

    #[test]
    fn test_save_and_load_float_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tone.wav");
        let buffer = generate_stereo_test_tone(220.0, 330.0, 0.1, DEFAULT_SAMPLE_RATE);

        save_audio(&buffer, &path, ExportFormat::float()).unwrap();
        let loaded = load_audio(&path, DEFAULT_SAMPLE_RATE).unwrap();

        assert_eq!(loaded.shape(), buffer.shape());
        for (a, b) in loaded.samples[1].iter().zip(&buffer.samples[1]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_save_16_bit_quantizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone16.wav");
        let buffer = generate_test_tone(440.0, 0.05, DEFAULT_SAMPLE_RATE);

        save_audio(&buffer, &path, ExportFormat::default()).unwrap();
        let info = audio_info(&path).unwrap();
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.channels, 1);
        assert_eq!(info.frames as usize, buffer.len());

        let loaded = load_audio(&path, DEFAULT_SAMPLE_RATE).unwrap();
        for (a, b) in loaded.samples[0].iter().zip(&buffer.samples[0]) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_load_resamples_to_target_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("48k.wav");
        let buffer = generate_test_tone(440.0, 0.2, 48000);
        save_audio(&buffer, &path, ExportFormat::float()).unwrap();

        let loaded = load_audio(&path, DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(loaded.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(loaded.len(), 8820);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_audio(Path::new("/definitely/not/here.wav"), DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(FxError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        fs::write(&path, b"not a wav file at all").unwrap();
        let result = load_audio(&path, DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(FxError::InvalidAudio { .. })));
    }

    #[test]
    fn test_resample_identity_keeps_samples() {
        let buffer = generate_test_tone(440.0, 0.01, DEFAULT_SAMPLE_RATE);
        let same = resample(&buffer, DEFAULT_SAMPLE_RATE);
        assert_eq!(same, buffer);
    }

    #[test]
    fn test_resample_upsamples_length() {
        let buffer = generate_test_tone(100.0, 0.1, 22050);
        let up = resample(&buffer, DEFAULT_SAMPLE_RATE);
        assert_eq!(up.len(), buffer.len() * 2);
    }
}
