//! FX rack
//!
//! One invocation end to end: resolve parameters, optionally randomize
//! them from a seed, build the chain, normalize the caller's array, process
//! and restore. Each `process` call builds everything fresh.

use log::{debug, info};

use crate::engine::SampleArray;
use crate::error::Result;
use crate::fx::builder::build_seeded;
use crate::fx::chain::ChainSettings;
use crate::fx::contract::normalize;
use crate::fx::params::ParameterTable;
use crate::fx::random::{apply, randomize};
use crate::fx::resolver::{resolve, PresetChoice, Resolution, UnknownPresetWarning};
use crate::fx::session::SessionType;

/// Result of one rack invocation
#[derive(Debug, Clone)]
pub struct RackOutput {
    /// Processed audio in the caller's orientation (`(T,)` comes back as `(1, T)`)
    pub audio: SampleArray,
    pub settings: ChainSettings,
    pub warnings: Vec<UnknownPresetWarning>,
}

/// Per-session effect rack configuration
///
/// # Example
/// ```
/// use stemfx::engine::SampleArray;
/// use stemfx::fx::{FxRack, SessionType};
///
/// let audio = SampleArray::from_vec(vec![0.1; 4410]);
/// let out = FxRack::new(SessionType::Bass)
///     .with_preset("fuzz")
///     .process(&audio, 44100)
///     .unwrap();
/// assert_eq!(out.audio.shape(), &[1, 4410]);
/// ```
#[derive(Debug, Clone)]
pub struct FxRack {
    session: SessionType,
    preset: PresetChoice,
    overrides: ParameterTable,
    seed: Option<u32>,
}

impl FxRack {
    /// Rack for `session` using its default preset
    pub fn new(session: SessionType) -> Self {
        Self {
            session,
            preset: PresetChoice::default_for(session),
            overrides: ParameterTable::new(),
            seed: None,
        }
    }

    pub fn with_preset(mut self, preset: impl Into<PresetChoice>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn with_overrides(mut self, overrides: ParameterTable) -> Self {
        self.overrides = overrides;
        self
    }

    /// Randomize ranged parameters from `seed`
    pub fn with_seed(mut self, seed: Option<u32>) -> Self {
        self.seed = seed;
        self
    }

    pub fn session(&self) -> SessionType {
        self.session
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    /// Resolve the parameter table this rack would process with
    ///
    /// Sampled values override presets and overrides for ranged keys.
    pub fn resolve(&self) -> Result<Resolution> {
        let mut resolution = resolve(self.session, &self.preset, &self.overrides)?;
        if let Some(seed) = self.seed {
            let sample = randomize(self.session, seed)?;
            info!("{} seed {}: {}", self.session, seed, sample.values);
            resolution.table = apply(&resolution.table, &sample);
        }
        Ok(resolution)
    }

    /// Process one array
    ///
    /// # Errors
    /// `Configuration` for bad overrides or ranges, `Shape` for arrays that
    /// break the orientation rule, `DspOverflow` if a unit goes non-finite.
    pub fn process(&self, audio: &SampleArray, sample_rate: u32) -> Result<RackOutput> {
        let resolution = self.resolve()?;
        let mut chain = build_seeded(&resolution, self.seed)?;

        let (mut buffer, restore) = normalize(audio)?;
        debug!(
            "{} rack: preset '{}', {} slots, {:?}",
            self.session,
            resolution.preset,
            chain.len(),
            buffer.shape()
        );
        chain.process(&mut buffer, sample_rate)?;

        Ok(RackOutput {
            audio: restore.apply(buffer)?,
            settings: chain.get_settings(),
            warnings: resolution.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::random::SeededRng;

    fn noise_buffer(channels: usize, samples: usize, seed: u32) -> SampleArray {
        let mut rng = SeededRng::new(seed);
        let data = (0..channels * samples)
            .map(|_| rng.uniform(-0.5, 0.5) as f32)
            .collect();
        SampleArray::from_shape_vec(channels, samples, data).unwrap()
    }

    #[test]
    fn test_seed_overrides_ranged_keys_only() {
        let rack = FxRack::new(SessionType::Guitar)
            .with_overrides(ParameterTable::from_pairs(&[("drive_db", 40.0), ("comp_ratio", 6.0)]))
            .with_seed(Some(3));
        let table = rack.resolve().unwrap().table;
        assert!(table.get("drive_db").unwrap() <= 30.0);
        assert_eq!(table.get("comp_ratio"), Some(6.0));
    }

    #[test]
    fn test_no_seed_no_randomization() {
        let rack = FxRack::new(SessionType::Vocal);
        let table = rack.resolve().unwrap().table;
        assert_eq!(table.get("saturation_drive_db"), Some(4.5));
    }

    #[test]
    fn test_process_reports_settings_and_warnings() {
        let audio = noise_buffer(2, 4410, 1);
        let out = FxRack::new(SessionType::Synth)
            .with_preset("organ")
            .with_seed(Some(11))
            .process(&audio, 44100)
            .unwrap();
        assert_eq!(out.audio.shape(), &[2, 4410]);
        assert_eq!(out.settings.preset, "default");
        assert_eq!(out.settings.seed, Some(11));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_channel_last_input_comes_back_channel_last() {
        let audio = noise_buffer(2, 2000, 2).transpose();
        let out = FxRack::new(SessionType::Bass).process(&audio, 44100).unwrap();
        assert_eq!(out.audio.shape(), &[2000, 2]);
        assert!(out.audio.is_finite());
    }
}
