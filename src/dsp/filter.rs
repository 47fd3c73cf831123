//! Pass and notch filters
//!
//! A [`Filter`] is a cascade of biquad sections sharing one purpose: the
//! vocal high-pass, the de-esser cut, or the guitar tone band-pass.

use crate::dsp::biquad::{BiquadSection, FilterType, BUTTERWORTH_Q};
use crate::dsp::effect::{unknown_param, Effect, EffectParams};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What the filter does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    HighPass,
    LowPass,
    /// 4th-order high-pass into 4th-order low-pass
    BandPass,
    /// Bell boost or cut
    Peak,
}

/// Filter effect
#[derive(Debug, Clone)]
pub struct Filter {
    params: EffectParams,
    mode: FilterMode,
    sections: Vec<BiquadSection>,
    sample_rate: u32,
}

impl Filter {
    fn with_sections(mode: FilterMode, sections: Vec<BiquadSection>) -> Self {
        Self {
            params: EffectParams::default(),
            mode,
            sections,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// 2-pole Butterworth high-pass
    pub fn high_pass(cutoff_hz: f32) -> Self {
        Self::with_sections(
            FilterMode::HighPass,
            vec![BiquadSection::new(FilterType::HighPass, cutoff_hz, 0.0, BUTTERWORTH_Q)],
        )
    }

    /// 2-pole Butterworth low-pass
    pub fn low_pass(cutoff_hz: f32) -> Self {
        Self::with_sections(
            FilterMode::LowPass,
            vec![BiquadSection::new(FilterType::LowPass, cutoff_hz, 0.0, BUTTERWORTH_Q)],
        )
    }

    /// Band-pass between `low_cut_hz` and `high_cut_hz`
    ///
    /// Each edge is two cascaded 2-pole sections.
    pub fn band_pass(low_cut_hz: f32, high_cut_hz: f32) -> Self {
        Self::with_sections(
            FilterMode::BandPass,
            vec![
                BiquadSection::new(FilterType::HighPass, low_cut_hz, 0.0, BUTTERWORTH_Q),
                BiquadSection::new(FilterType::HighPass, low_cut_hz, 0.0, BUTTERWORTH_Q),
                BiquadSection::new(FilterType::LowPass, high_cut_hz, 0.0, BUTTERWORTH_Q),
                BiquadSection::new(FilterType::LowPass, high_cut_hz, 0.0, BUTTERWORTH_Q),
            ],
        )
    }

    /// Bell filter at `freq_hz`
    pub fn peak(freq_hz: f32, gain_db: f32, q: f32) -> Self {
        let section = BiquadSection::new(FilterType::Peak, freq_hz, gain_db, q);
        Self::with_sections(FilterMode::Peak, vec![section])
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Combined magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f32) -> f32 {
        self.sections
            .iter()
            .map(|s| s.magnitude_db(frequency, self.sample_rate))
            .sum()
    }

    fn redesign(&mut self) {
        let sample_rate = self.sample_rate;
        self.sections.iter_mut().for_each(|s| s.design(sample_rate));
    }

    fn set_all(&mut self, filter_type: FilterType, apply: impl Fn(&mut BiquadSection)) {
        self.sections
            .iter_mut()
            .filter(|s| s.filter_type == filter_type)
            .for_each(apply);
        self.redesign();
    }
}

impl Effect for Filter {
    impl_effect_common!(Filter, "filter", "Filter");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        for section in self.sections.iter_mut() {
            for (ch, samples) in buffer.samples.iter_mut().enumerate() {
                section.process_channel(ch, samples);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.redesign();
    }

    fn reset(&mut self) {
        self.sections.iter_mut().for_each(BiquadSection::reset);
    }

    fn get_params(&self) -> Value {
        let sections: Vec<Value> = self
            .sections
            .iter()
            .map(|s| {
                json!({
                    "type": s.filter_type,
                    "frequency": s.frequency,
                    "gain_db": s.gain_db,
                    "q": s.q
                })
            })
            .collect();
        json!({
            "mode": self.mode,
            "sections": sections,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        match (self.mode, name) {
            (FilterMode::HighPass, "cutoff_hz") | (FilterMode::BandPass, "low_cut_hz") => {
                self.set_all(FilterType::HighPass, |s| s.frequency = value)
            }
            (FilterMode::LowPass, "cutoff_hz") | (FilterMode::BandPass, "high_cut_hz") => {
                self.set_all(FilterType::LowPass, |s| s.frequency = value)
            }
            (FilterMode::Peak, "freq_hz") => {
                self.set_all(FilterType::Peak, |s| s.frequency = value)
            }
            (FilterMode::Peak, "gain_db") => self.set_all(FilterType::Peak, |s| s.gain_db = value),
            (FilterMode::Peak, "q") => self.set_all(FilterType::Peak, |s| s.q = value),
            _ => return Err(unknown_param("filter", name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::generate_test_tone;

    fn tone_peak_after(filter: &mut Filter, freq: f32) -> f32 {
        let mut buffer = generate_test_tone(freq, 0.5, 44100);
        filter.prepare(44100);
        filter.process(&mut buffer);
        // Skip the transient
        buffer.samples[0][11025..].iter().fold(0.0_f32, |a, s| a.max(s.abs()))
    }

    #[test]
    fn test_highpass_attenuates_lows() {
        let mut hpf = Filter::high_pass(1000.0);
        let low = tone_peak_after(&mut hpf, 60.0);
        hpf.reset();
        let high = tone_peak_after(&mut hpf, 8000.0);
        assert!(low < 0.02, "60 Hz leaked through: {}", low);
        assert!(high > 0.95);
    }

    #[test]
    fn test_band_pass_is_fourth_order() {
        let mut bpf = Filter::band_pass(80.0, 6000.0);
        bpf.prepare(44100);
        // One octave under the low edge: ~24 dB/oct plus 6 dB at the edge
        assert!(bpf.magnitude_db(40.0) < -20.0);
        assert!(bpf.magnitude_db(1000.0).abs() < 0.5);
        assert!(bpf.magnitude_db(12000.0) < -20.0);
    }

    #[test]
    fn test_peak_cut() {
        let filter = Filter::peak(6000.0, -4.0, 3.0);
        assert!((filter.magnitude_db(6000.0) + 4.0).abs() < 0.05);
        assert!(filter.magnitude_db(500.0).abs() < 0.1);
    }

    #[test]
    fn test_set_param_by_mode() {
        let mut bpf = Filter::band_pass(80.0, 6000.0);
        assert!(bpf.set_param("low_cut_hz", 100.0).is_ok());
        assert!(bpf.set_param("cutoff_hz", 100.0).is_err());
        assert_eq!(bpf.get_params()["sections"][0]["frequency"], json!(100.0));
    }
}
