//! Audio Engine Module
//!
//! Buffers and file I/O shared by the FX engine and the pipeline:
//! - Channel-first working buffer and level helpers
//! - Caller-facing sample arrays
//! - WAV load/save with resampling

pub mod array;
pub mod buffer;
pub mod io;

pub use array::SampleArray;
pub use buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
pub use io::{
    audio_info, generate_stereo_test_tone, generate_test_tone, load_audio, resample, save_audio,
    AudioInfo, ExportFormat,
};
