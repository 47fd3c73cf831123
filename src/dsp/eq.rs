//! Parametric EQ Effect
//!
//! Cascaded biquad bands. Used for the vocal presence/air boosts, the bass
//! shelf and scoop, and the three-band synth EQ.

use crate::dsp::biquad::{BiquadSection, FilterType};
use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum number of EQ bands
pub const MAX_BANDS: usize = 8;

/// Single EQ band configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Label used in parameter names, e.g. `presence`
    pub name: String,
    pub filter_type: FilterType,
    /// Center/corner frequency in Hz
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
}

impl EqBand {
    pub fn new(name: &str, filter_type: FilterType, frequency: f32, gain_db: f32, q: f32) -> Self {
        Self {
            name: name.to_string(),
            filter_type,
            frequency,
            gain_db,
            q,
        }
    }

    pub fn peak(name: &str, frequency: f32, gain_db: f32, q: f32) -> Self {
        Self::new(name, FilterType::Peak, frequency, gain_db, q)
    }

    pub fn low_shelf(name: &str, frequency: f32, gain_db: f32, q: f32) -> Self {
        Self::new(name, FilterType::LowShelf, frequency, gain_db, q)
    }

    pub fn high_shelf(name: &str, frequency: f32, gain_db: f32, q: f32) -> Self {
        Self::new(name, FilterType::HighShelf, frequency, gain_db, q)
    }

    /// A band with no gain has no effect
    fn is_flat(&self) -> bool {
        self.gain_db.abs() < 0.01
    }
}

/// Parametric EQ effect with up to 8 bands
#[derive(Debug, Clone)]
pub struct ParametricEq {
    params: EffectParams,
    bands: Vec<EqBand>,
    sections: Vec<BiquadSection>,
    sample_rate: u32,
}

impl ParametricEq {
    pub fn new() -> Self {
        Self {
            params: EffectParams::default(),
            bands: Vec::new(),
            sections: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Build from a list of bands
    ///
    /// # Errors
    /// `Configuration` when more than [`MAX_BANDS`] bands are given.
    pub fn with_bands(bands: Vec<EqBand>) -> Result<Self> {
        let mut eq = Self::new();
        for band in bands {
            eq.add_band(band)?;
        }
        Ok(eq)
    }

    pub fn add_band(&mut self, band: EqBand) -> Result<()> {
        if self.bands.len() >= MAX_BANDS {
            return Err(FxError::config(
                band.name.clone(),
                format!("EQ supports at most {} bands", MAX_BANDS),
            ));
        }
        let mut section =
            BiquadSection::new(band.filter_type, band.frequency, band.gain_db, band.q);
        section.design(self.sample_rate);
        self.sections.push(section);
        self.bands.push(band);
        Ok(())
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    /// Combined magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f32) -> f32 {
        self.sections
            .iter()
            .map(|s| s.magnitude_db(frequency, self.sample_rate))
            .sum()
    }

    fn rebuild_section(&mut self, index: usize) {
        let band = &self.bands[index];
        let mut section =
            BiquadSection::new(band.filter_type, band.frequency, band.gain_db, band.q);
        section.design(self.sample_rate);
        self.sections[index] = section;
    }
}

impl Default for ParametricEq {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ParametricEq {
    impl_effect_common!(ParametricEq, "parametric_eq", "Parametric EQ");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        for (band, section) in self.bands.iter().zip(self.sections.iter_mut()) {
            if band.is_flat() {
                continue;
            }
            for (ch, samples) in buffer.samples.iter_mut().enumerate() {
                section.process_channel(ch, samples);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.sections.iter_mut().for_each(|s| s.design(sample_rate));
    }

    fn reset(&mut self) {
        self.sections.iter_mut().for_each(BiquadSection::reset);
    }

    fn get_params(&self) -> Value {
        json!({
            "bands": self.bands,
            "enabled": self.params.enabled
        })
    }

    /// Band parameters are addressed as `{band}_freq_hz`, `{band}_gain_db`, `{band}_q`
    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        let found = self.bands.iter().enumerate().find_map(|(i, band)| {
            name.strip_prefix(band.name.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| (i, field.to_string()))
        });
        let Some((index, field)) = found else {
            return Err(unknown_param("parametric_eq", name));
        };

        let band = &mut self.bands[index];
        match field.as_str() {
            "freq_hz" => band.frequency = value,
            "gain_db" => band.gain_db = value,
            "q" => band.q = value,
            _ => return Err(unknown_param("parametric_eq", name)),
        }
        self.rebuild_section(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocal_eq() -> ParametricEq {
        ParametricEq::with_bands(vec![
            EqBand::peak("presence", 3000.0, 12.0, 1.0),
            EqBand::peak("air", 10000.0, 12.0, 0.7),
        ])
        .unwrap()
    }

    #[test]
    fn test_band_limit() {
        let mut eq = ParametricEq::new();
        for i in 0..MAX_BANDS {
            eq.add_band(EqBand::peak(&format!("b{}", i), 1000.0, 1.0, 1.0)).unwrap();
        }
        assert!(eq.add_band(EqBand::peak("extra", 1000.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_cascaded_response() {
        let eq = vocal_eq();
        assert!(eq.magnitude_db(3000.0) > 12.0);
        assert!(eq.magnitude_db(50.0).abs() < 0.5);
    }

    #[test]
    fn test_set_band_param() {
        let mut eq = vocal_eq();
        eq.set_param("air_gain_db", 0.0).unwrap();
        assert_eq!(eq.bands()[1].gain_db, 0.0);
        assert!(eq.set_param("air_width", 1.0).is_err());
        assert!(eq.set_param("mud_gain_db", 1.0).is_err());
    }

    #[test]
    fn test_flat_eq_is_transparent() {
        let band = EqBand::low_shelf("low", 200.0, 0.0, 0.707);
        let mut eq = ParametricEq::with_bands(vec![band]).unwrap();
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.25; 100]],
            sample_rate: 44100,
        };
        eq.process(&mut buffer);
        assert!(buffer.samples[0].iter().all(|&s| s == 0.25));
    }
}
