//! Stem processing and the full separation pipeline

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Serialize;

use crate::engine::{load_audio, save_audio, AudioBuffer, ExportFormat, SampleArray};
use crate::error::{FxError, Result};
use crate::fx::{
    check_frame_count, ChainSettings, FxRack, ParameterTable, PresetChoice, SessionType,
};
use crate::pipeline::manifest::RunManifest;
use crate::pipeline::separator::{conform_stem, Separator};
use crate::pipeline::stem::Stem;

/// Preset, overrides and seed for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    pub preset: PresetChoice,
    pub overrides: ParameterTable,
    pub seed: Option<u32>,
}

impl SessionSetup {
    pub fn rack(&self, session: SessionType) -> FxRack {
        FxRack::new(session)
            .with_preset(self.preset.clone())
            .with_overrides(self.overrides.clone())
            .with_seed(self.seed)
    }
}

/// One setup per session for a pipeline run
///
/// Defaults: vocal `default`, guitar `clean`, bass `default`, synth `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPresets {
    setups: BTreeMap<SessionType, SessionSetup>,
}

impl Default for SessionPresets {
    fn default() -> Self {
        let setups = SessionType::ALL
            .iter()
            .map(|&session| {
                (
                    session,
                    SessionSetup {
                        preset: PresetChoice::default_for(session),
                        overrides: ParameterTable::new(),
                        seed: None,
                    },
                )
            })
            .collect();
        Self { setups }
    }
}

impl SessionPresets {
    pub fn with_preset(mut self, session: SessionType, preset: impl Into<PresetChoice>) -> Self {
        if let Some(setup) = self.setups.get_mut(&session) {
            setup.preset = preset.into();
        }
        self
    }

    /// Use `seed` for every session
    pub fn with_seed(mut self, seed: Option<u32>) -> Self {
        self.setups.values_mut().for_each(|setup| setup.seed = seed);
        self
    }

    pub fn set(
        &mut self,
        session: SessionType,
        preset: PresetChoice,
        overrides: ParameterTable,
        seed: Option<u32>,
    ) {
        self.setups.insert(
            session,
            SessionSetup {
                preset,
                overrides,
                seed,
            },
        );
    }

    pub fn rack(&self, session: SessionType) -> FxRack {
        match self.setups.get(&session) {
            Some(setup) => setup.rack(session),
            None => FxRack::new(session),
        }
    }
}

/// A stem that could not be produced
#[derive(Debug, Clone, Serialize)]
pub struct StemFailure {
    pub stem: Stem,
    pub error: String,
}

/// Outcome of [`run_pipeline`]
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub raw: BTreeMap<Stem, PathBuf>,
    pub processed: BTreeMap<Stem, PathBuf>,
    pub settings: BTreeMap<Stem, ChainSettings>,
    pub failures: Vec<StemFailure>,
    pub manifest: PathBuf,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.processed.len() == Stem::ALL.len()
    }
}

/// Run `rack` over a channel-first buffer
///
/// The buffer's layout is taken as given, so a buffer with no more samples
/// than channels is a `Shape` error rather than being read channel-last.
pub fn process_buffer(
    rack: &FxRack,
    buffer: &AudioBuffer,
) -> Result<(AudioBuffer, ChainSettings)> {
    check_frame_count(&buffer.shape(), buffer.channels(), buffer.len())?;
    let array = SampleArray::from_rows(buffer.samples.clone())?;
    let output = rack.process(&array, buffer.sample_rate)?;
    let processed = AudioBuffer::from_channels(output.audio.rows(), buffer.sample_rate)?;
    Ok((processed, output.settings))
}

/// Process one file with a fully configured rack, writing 16-bit WAV
pub fn process_file(
    input: &Path,
    output: &Path,
    rack: &FxRack,
    sample_rate: u32,
) -> Result<ChainSettings> {
    info!("processing {} stem: {}", rack.session(), input.display());
    let audio = load_audio(input, sample_rate)?;
    let (processed, settings) = process_buffer(rack, &audio)?;
    save_audio(&processed, output, ExportFormat::default())?;
    info!("saved {}", output.display());
    Ok(settings)
}

/// Process one stem file with a session preset
pub fn process_stem(
    input: &Path,
    output: &Path,
    session: SessionType,
    preset: &PresetChoice,
    sample_rate: u32,
) -> Result<ChainSettings> {
    let rack = FxRack::new(session).with_preset(preset.clone());
    process_file(input, output, &rack, sample_rate)
}

/// Separate `input` and process each stem with its session chain
///
/// Raw stems go to `output_dir/separated/{stem}.wav`, processed ones to
/// `output_dir/processed/{stem}_processed.wav`. A failing stem is recorded
/// in the report and the others still run.
pub fn run_pipeline(
    input: &Path,
    output_dir: &Path,
    presets: &SessionPresets,
    device: &str,
    separator: &dyn Separator,
) -> Result<PipelineReport> {
    if !input.exists() {
        return Err(FxError::FileNotFound {
            path: input.display().to_string(),
            source: None,
        });
    }

    let separated_dir = output_dir.join("separated");
    let processed_dir = output_dir.join("processed");
    fs::create_dir_all(&separated_dir)?;
    fs::create_dir_all(&processed_dir)?;

    let sample_rate = separator.sample_rate();
    info!("pipeline: {} on {} ({})", input.display(), device, separator.name());

    let mixture = load_audio(input, sample_rate)?;
    info!("separating {:.2}s of audio", mixture.duration_secs());
    let stems = separator.separate(&mixture)?;

    let mut manifest = RunManifest::new(input, device, separator.name(), sample_rate);
    let mut report = PipelineReport::default();

    for stem in Stem::ALL {
        let result = stems
            .get(&stem)
            .ok_or_else(|| FxError::Separation {
                stem: stem.to_string(),
                reason: "stem missing from separation output".to_string(),
            })
            .and_then(|buffer| {
                run_stem(
                    stem,
                    buffer,
                    presets,
                    sample_rate,
                    &separated_dir,
                    &processed_dir,
                    &mut report,
                )
            });

        if let Err(e) = result {
            error!("{} stem failed: {}", stem, e);
            manifest.failures.push(format!("{}: {}", stem, e));
            report.failures.push(StemFailure {
                stem,
                error: e.to_string(),
            });
        }
    }

    for path in report.raw.values().chain(report.processed.values()) {
        manifest.add_file(output_dir, path)?;
    }
    report.manifest = manifest.write(output_dir)?;

    info!(
        "pipeline finished: {} processed, {} failed",
        report.processed.len(),
        report.failures.len()
    );
    Ok(report)
}

fn run_stem(
    stem: Stem,
    buffer: &AudioBuffer,
    presets: &SessionPresets,
    sample_rate: u32,
    separated_dir: &Path,
    processed_dir: &Path,
    report: &mut PipelineReport,
) -> Result<()> {
    let raw_path = separated_dir.join(format!("{}.wav", stem));
    save_audio(buffer, &raw_path, ExportFormat::default())?;
    report.raw.insert(stem, raw_path);

    let stem_audio = conform_stem(stem, buffer, sample_rate)?;
    let rack = presets.rack(stem.session());
    let (processed, settings) = process_buffer(&rack, &stem_audio)?;

    let processed_path = processed_dir.join(format!("{}_processed.wav", stem));
    save_audio(&processed, &processed_path, ExportFormat::default())?;

    info!("{} ({} preset '{}')", stem, settings.session, settings.preset);
    for (key, value) in settings.parameters.iter() {
        info!("  {} = {}", key, value);
    }

    report.processed.insert(stem, processed_path);
    report.settings.insert(stem, settings);
    Ok(())
}
