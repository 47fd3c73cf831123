//! stemfx - effect chains for separated stems
//!
//! Each stem of a separated recording is processed by a fixed chain of
//! effects chosen by its session (vocal, guitar, bass, synth). A chain's
//! parameters come from a named preset, optional overrides and an optional
//! seeded randomization over per-parameter ranges.
//!
//! # Architecture
//!
//! - `dsp`: the effect units and the `Effect` trait
//! - `engine`: audio buffers, sample arrays and WAV I/O
//! - `fx`: sessions, presets, resolution, randomization and the chain
//! - `pipeline`: separation, per-stem processing, batch and run manifest

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod fx;
pub mod pipeline;

pub use error::{FxError, Result};
