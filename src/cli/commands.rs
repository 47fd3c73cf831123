//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::FxConfig;
use crate::error::{FxError, Result};
use crate::fx::{
    randomize, FxRack, ParameterTable, Preset, PresetChoice, SessionType, PRESET_VERSION,
};
use crate::pipeline::{
    batch_process, collect_inputs, process_file, run_pipeline, BridgeSeparator, DirectorySeparator,
    SessionPresets, Separator,
};

fn preset_choice(session: SessionType, preset: Option<String>) -> PresetChoice {
    preset
        .map(PresetChoice::Named)
        .unwrap_or_else(|| PresetChoice::default_for(session))
}

/// Process one stem file.
pub fn process(
    input: &Path,
    output: &Path,
    session: SessionType,
    preset: Option<String>,
    overrides: Vec<(String, f32)>,
    seed: Option<u32>,
    sample_rate: u32,
) -> Result<()> {
    let overrides: ParameterTable = overrides.into_iter().collect();
    let rack = FxRack::new(session)
        .with_preset(preset_choice(session, preset))
        .with_overrides(overrides)
        .with_seed(seed);

    let settings = process_file(input, output, &rack, sample_rate)?;
    println!("Processed: {} -> {}", input.display(), output.display());
    println!("{}", settings.to_json_pretty()?);
    Ok(())
}

/// Separate a mix and process every stem.
pub fn pipeline(
    input: &Path,
    output_dir: &Path,
    device: &str,
    stems_dir: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let presets = match config {
        Some(path) => {
            info!("using config {}", path.display());
            FxConfig::load(path)?.session_presets()
        }
        None => SessionPresets::default(),
    };

    let separator: Box<dyn Separator> = match stems_dir {
        Some(dir) => Box::new(DirectorySeparator::new(dir)),
        None => Box::new(BridgeSeparator::new(device, output_dir.join("work"))),
    };

    let report = run_pipeline(input, output_dir, &presets, device, separator.as_ref())?;

    for (stem, path) in &report.processed {
        println!("{:<8} {}", stem, path.display());
    }
    for failure in &report.failures {
        println!("{:<8} FAILED: {}", failure.stem, failure.error);
    }
    println!("Manifest: {}", report.manifest.display());
    Ok(())
}

/// Process many files with one session preset.
pub fn batch(
    inputs: Vec<PathBuf>,
    input_dir: Option<&Path>,
    output_dir: &Path,
    session: SessionType,
    preset: Option<String>,
    no_effects: bool,
) -> Result<()> {
    let mut inputs = inputs;
    if let Some(dir) = input_dir {
        inputs.extend(collect_inputs(dir)?);
    }
    if inputs.is_empty() {
        return Err(FxError::config("inputs", "no input files given"));
    }

    let report = batch_process(
        &inputs,
        output_dir,
        session,
        &preset_choice(session, preset),
        !no_effects,
    );

    for failure in &report.failures {
        println!("FAILED {}: {}", failure.input.display(), failure.error);
    }
    println!("Batch: {} succeeded, {} failed", report.succeeded(), report.failed());
    Ok(())
}

/// List sessions, presets and slot order.
pub fn presets(session: Option<SessionType>) -> Result<()> {
    let sessions: Vec<SessionType> = match session {
        Some(s) => vec![s],
        None => SessionType::ALL.to_vec(),
    };

    println!("preset tables v{}", PRESET_VERSION);
    for session in sessions {
        let default = Preset::default_for(session);
        println!("{}", session);
        let names: Vec<String> = Preset::all(session)
            .iter()
            .map(|p| {
                if *p == default {
                    format!("{} (default)", p.id())
                } else {
                    p.id().to_string()
                }
            })
            .collect();
        println!("  presets: {}", names.join(", "));
        let slots: Vec<&str> = session.slots().iter().map(|slot| slot.name()).collect();
        println!("  chain:   {}", slots.join(" -> "));
    }
    Ok(())
}

/// Print randomized parameters as JSON.
pub fn sample(session: SessionType, seed: u32) -> Result<()> {
    let sample = randomize(session, seed)?;
    println!("{}", serde_json::to_string_pretty(&sample)?);
    Ok(())
}
