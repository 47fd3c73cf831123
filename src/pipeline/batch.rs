//! Batch processing
//!
//! Every file is an independent invocation. Files run in parallel and a
//! failure only affects its own entry in the report.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::engine::{load_audio, save_audio, ExportFormat, DEFAULT_SAMPLE_RATE};
use crate::error::{FxError, Result};
use crate::fx::{FxRack, PresetChoice, SessionType};
use crate::pipeline::run::process_file;

/// A file that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Written files, in input order
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// `{file_stem}_{session}_processed{ext}` inside `output_dir`
pub fn output_path(input: &Path, output_dir: &Path, session: SessionType) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".wav".to_string());
    output_dir.join(format!("{}_{}_processed{}", stem, session, ext))
}

/// Process `inputs` with one session preset
///
/// With `apply_effects == false` files are only resampled and re-encoded.
/// Inputs whose output name is already claimed by an earlier input fail
/// without being processed.
pub fn batch_process(
    inputs: &[PathBuf],
    output_dir: &Path,
    session: SessionType,
    preset: &PresetChoice,
    apply_effects: bool,
) -> BatchReport {
    info!(
        "batch: {} files, session {}, effects {}",
        inputs.len(),
        session,
        if apply_effects { "on" } else { "off" }
    );
    let rack = FxRack::new(session).with_preset(preset.clone());

    let plans = plan_outputs(inputs, output_dir, session);

    let results: Vec<(PathBuf, Result<PathBuf>)> = plans
        .into_par_iter()
        .map(|(input, plan)| {
            let result = plan.and_then(|output| {
                process_one(&input, &output, &rack, apply_effects).map(|_| output)
            });
            (input, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (input, result) in results {
        match result {
            Ok(output) => report.outputs.push(output),
            Err(e) => {
                error!("{} failed: {}", input.display(), e);
                report.failures.push(BatchFailure {
                    input,
                    error: e.to_string(),
                });
            }
        }
    }

    info!("batch finished: {} ok, {} failed", report.succeeded(), report.failed());
    report
}

/// Pair each input with its output path, in input order
fn plan_outputs(
    inputs: &[PathBuf],
    output_dir: &Path,
    session: SessionType,
) -> Vec<(PathBuf, Result<PathBuf>)> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    inputs
        .iter()
        .map(|input| {
            let output = output_path(input, output_dir, session);
            let plan = match claimed.get(&output) {
                Some(first) => {
                    warn!(
                        "{} would overwrite the output of {}",
                        input.display(),
                        first.display()
                    );
                    Err(FxError::config(
                        "output",
                        format!(
                            "{} is already written for {}",
                            output.display(),
                            first.display()
                        ),
                    ))
                }
                None => {
                    claimed.insert(output.clone(), input);
                    Ok(output)
                }
            };
            (input.clone(), plan)
        })
        .collect()
}

fn process_one(input: &Path, output: &Path, rack: &FxRack, apply_effects: bool) -> Result<()> {
    if !input.exists() {
        return Err(FxError::FileNotFound {
            path: input.display().to_string(),
            source: None,
        });
    }
    if apply_effects {
        process_file(input, output, rack, DEFAULT_SAMPLE_RATE)?;
    } else {
        let audio = load_audio(input, DEFAULT_SAMPLE_RATE)?;
        save_audio(&audio, output, ExportFormat::default())?;
    }
    Ok(())
}

/// All `.wav` files under `dir`, sorted
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FxError::FileNotFound {
            path: dir.display().to_string(),
            source: None,
        });
    }

    let mut inputs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();
    inputs.sort();
    Ok(inputs)
}
