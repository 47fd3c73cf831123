//! CLI Module
//!
//! Command-line interface for stemfx.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fx::SessionType;

/// stemfx - session effect chains for separated stems
#[derive(Parser, Debug)]
#[command(name = "stemfx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one stem file with a session chain
    #[command(name = "process")]
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Session: vocal, guitar, bass or synth
        #[arg(short, long)]
        session: SessionType,

        /// Preset name (session default if omitted)
        #[arg(short, long)]
        preset: Option<String>,

        /// Override a parameter, e.g. --set reverb_wet=0.3
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        overrides: Vec<(String, f32)>,

        /// Randomize ranged parameters from this seed
        #[arg(long)]
        seed: Option<u32>,

        /// Processing sample rate
        #[arg(long, default_value_t = crate::engine::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
    },

    /// Separate a mix and process every stem
    #[command(name = "pipeline")]
    Pipeline {
        /// Mixed input WAV file
        input: PathBuf,

        /// Directory for separated and processed stems
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Device for the separation model
        #[arg(short, long, default_value = "cpu")]
        device: String,

        /// Use stems already separated into this directory
        #[arg(long)]
        stems_dir: Option<PathBuf>,

        /// JSON config selecting presets per session
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Process many files with one session preset
    #[command(name = "batch")]
    Batch {
        /// Input WAV files
        inputs: Vec<PathBuf>,

        /// Process every WAV file under this directory
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Session: vocal, guitar, bass or synth
        #[arg(short, long)]
        session: SessionType,

        /// Preset name (session default if omitted)
        #[arg(short, long)]
        preset: Option<String>,

        /// Only resample and re-encode
        #[arg(long)]
        no_effects: bool,
    },

    /// List sessions, presets and slot order
    #[command(name = "presets")]
    Presets {
        /// Only this session
        #[arg(short, long)]
        session: Option<SessionType>,
    },

    /// Print randomized parameters for a session as JSON
    #[command(name = "sample")]
    Sample {
        #[arg(short, long)]
        session: SessionType,

        #[arg(long)]
        seed: u32,
    },
}

/// Parse `key=value` for `--set`
pub fn parse_key_value(s: &str) -> Result<(String, f32), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((key.to_string(), value))
}
