//! Effects chain
//!
//! A fixed sequence of effect units for one session. Units are applied
//! strictly in slot order, each one feeding the next. Order is set when the
//! chain is built and cannot change afterwards.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsp::Effect;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::fx::contract::{adapt_channels, restore_channels};
use crate::fx::params::ParameterTable;
use crate::fx::preset::PRESET_VERSION;
use crate::fx::session::{SessionType, SlotKind};

/// One built slot: its position kind and the unit filling it
#[derive(Debug, Clone)]
pub struct ChainSlot {
    pub kind: SlotKind,
    pub unit: Box<dyn Effect>,
}

/// Settings of one slot as reported by [`EffectsChain::get_settings`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSettings {
    pub slot: String,
    pub effect: String,
    pub enabled: bool,
    pub params: Value,
}

/// Everything needed to audit or rebuild a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub session: SessionType,
    pub preset: String,
    /// [`PRESET_VERSION`] of the tables the parameters came from
    pub preset_version: u32,
    pub seed: Option<u32>,
    pub parameters: ParameterTable,
    pub slots: Vec<SlotSettings>,
}

impl ChainSettings {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Ordered effect units for one session
#[derive(Debug, Clone)]
pub struct EffectsChain {
    session: SessionType,
    preset: String,
    seed: Option<u32>,
    parameters: ParameterTable,
    slots: Vec<ChainSlot>,
}

impl EffectsChain {
    pub(crate) fn new(
        session: SessionType,
        preset: String,
        seed: Option<u32>,
        parameters: ParameterTable,
        slots: Vec<ChainSlot>,
    ) -> Self {
        Self {
            session,
            preset,
            seed,
            parameters,
            slots,
        }
    }

    pub fn session(&self) -> SessionType {
        self.session
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot kinds in application order
    pub fn slot_order(&self) -> Vec<SlotKind> {
        self.slots.iter().map(|s| s.kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainSlot> {
        self.slots.iter()
    }

    /// Run every unit over `buffer` in slot order
    ///
    /// Units are prepared for `sample_rate` first, so no state carries over
    /// from an earlier call. On error `buffer` is left untouched.
    ///
    /// # Errors
    /// `DspOverflow` naming the slot whose output was not finite, or
    /// `Shape` if a unit changed the buffer dimensions.
    pub fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) -> Result<()> {
        let shape = buffer.shape();
        let mut work = buffer.clone();
        work.sample_rate = sample_rate;

        for slot in &mut self.slots {
            slot.unit.prepare(sample_rate);
            slot.unit.reset();
            if !slot.unit.is_enabled() {
                debug!("{}: bypassed", slot.kind);
                continue;
            }

            let requirement = slot.unit.channel_requirement();
            if requirement.accepts(work.channels()) {
                slot.unit.process(&mut work);
            } else {
                warn!(
                    "{}: adapting {} channel(s) to {:?}",
                    slot.kind,
                    work.channels(),
                    requirement
                );
                let (mut adapted, original) = adapt_channels(&work, requirement);
                slot.unit.process(&mut adapted);
                work = restore_channels(adapted, original);
            }

            if work.shape() != shape {
                return Err(FxError::shape(
                    &work.shape(),
                    format!("slot '{}' changed the buffer from {:?}", slot.kind, shape),
                ));
            }
            if !work.is_finite() {
                return Err(FxError::DspOverflow {
                    effect: slot.kind.name().to_string(),
                });
            }
            debug!("{}: peak {:.4}", slot.kind, work.peak());
        }

        *buffer = work;
        Ok(())
    }

    /// Resolved parameters and identifiers this chain was built from
    pub fn get_settings(&self) -> ChainSettings {
        ChainSettings {
            session: self.session,
            preset: self.preset.clone(),
            preset_version: PRESET_VERSION,
            seed: self.seed,
            parameters: self.parameters.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| SlotSettings {
                    slot: slot.kind.name().to_string(),
                    effect: slot.unit.effect_type().to_string(),
                    enabled: slot.unit.is_enabled(),
                    params: slot.unit.get_params(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{ChannelRequirement, Effect, EffectParams, Gain, Reverb};
    use crate::impl_effect_common;

    /// Writes NaN into the first sample
    #[derive(Debug, Clone)]
    struct Poison {
        params: EffectParams,
    }

    impl Effect for Poison {
        impl_effect_common!(Poison, "poison", "Poison");

        fn process(&mut self, buffer: &mut AudioBuffer) {
            buffer.samples[0][0] = f32::NAN;
        }

        fn prepare(&mut self, _sample_rate: u32) {}

        fn reset(&mut self) {}

        fn get_params(&self) -> Value {
            Value::Null
        }

        fn set_param(&mut self, name: &str, _value: f32) -> Result<()> {
            Err(FxError::config(name, "no parameters"))
        }
    }

    fn chain_of(slots: Vec<ChainSlot>) -> EffectsChain {
        EffectsChain::new(SessionType::Guitar, "test".into(), None, ParameterTable::new(), slots)
    }

    fn create_test_buffer(channels: usize) -> AudioBuffer {
        let samples = (0..channels)
            .map(|_| (0..1000).map(|i| ((i as f32) * 0.05).sin() * 0.25).collect())
            .collect();
        AudioBuffer {
            samples,
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_units_apply_in_order() {
        let mut chain = chain_of(vec![
            ChainSlot {
                kind: SlotKind::OutputGain,
                unit: Box::new(Gain::new(6.0)),
            },
            ChainSlot {
                kind: SlotKind::Limiter,
                unit: Box::new(crate::dsp::Limiter::new(-6.0)),
            },
        ]);
        let mut buffer = create_test_buffer(2);
        chain.process(&mut buffer, 44100).unwrap();
        assert!(buffer.peak() <= crate::engine::buffer::db_to_linear(-6.0_f32) + 1e-4);
        assert_eq!(chain.slot_order(), vec![SlotKind::OutputGain, SlotKind::Limiter]);
    }

    #[test]
    fn test_non_finite_output_fails_and_leaves_input() {
        let mut chain = chain_of(vec![ChainSlot {
            kind: SlotKind::Distortion,
            unit: Box::new(Poison {
                params: EffectParams::default(),
            }),
        }]);
        let mut buffer = create_test_buffer(2);
        let before = buffer.clone();

        let err = chain.process(&mut buffer, 44100).unwrap_err();
        assert!(matches!(err, FxError::DspOverflow { ref effect } if effect == "distortion"));
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_stereo_unit_on_mono_buffer_keeps_mono() {
        let reverb = Reverb::default();
        assert_eq!(reverb.channel_requirement(), ChannelRequirement::Stereo);
        let mut chain = chain_of(vec![ChainSlot {
            kind: SlotKind::Reverb,
            unit: Box::new(reverb),
        }]);
        let mut buffer = create_test_buffer(1);
        chain.process(&mut buffer, 44100).unwrap();
        assert_eq!(buffer.shape(), [1, 1000]);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_disabled_unit_is_bypassed() {
        let mut gain = Gain::new(12.0);
        gain.set_enabled(false);
        let mut chain = chain_of(vec![ChainSlot {
            kind: SlotKind::OutputGain,
            unit: Box::new(gain),
        }]);
        let mut buffer = create_test_buffer(2);
        let before = buffer.clone();
        chain.process(&mut buffer, 44100).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_repeat_calls_are_independent() {
        let mut chain = chain_of(vec![ChainSlot {
            kind: SlotKind::Reverb,
            unit: Box::new(Reverb::default()),
        }]);
        let mut first = create_test_buffer(2);
        let mut second = create_test_buffer(2);
        chain.process(&mut first, 44100).unwrap();
        chain.process(&mut second, 44100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_settings_serialize() {
        let chain = chain_of(vec![ChainSlot {
            kind: SlotKind::OutputGain,
            unit: Box::new(Gain::new(-3.0)),
        }]);
        let settings = chain.get_settings();
        assert_eq!(settings.slots[0].slot, "output_gain");
        assert_eq!(settings.slots[0].effect, "gain");
        let json = settings.to_json_pretty().unwrap();
        assert!(json.contains("\"session\": \"guitar\""));
    }

    #[test]
    fn test_settings_record_preset_version() {
        let settings = chain_of(Vec::new()).get_settings();
        assert_eq!(settings.preset_version, PRESET_VERSION);

        let json = settings.to_json_pretty().unwrap();
        assert!(json.contains(&format!("\"preset_version\": {}", PRESET_VERSION)));
        let parsed: ChainSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
