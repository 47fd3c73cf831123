//! Chain builder
//!
//! Turns a resolved parameter table into one effect unit per session slot.

use log::debug;

use crate::dsp::{
    Chorus, Compressor, Delay, Distortion, Effect, EqBand, Filter, Gain, Gate, Limiter,
    ParametricEq, Reverb, BUTTERWORTH_Q,
};
use crate::error::Result;
use crate::fx::chain::{ChainSlot, EffectsChain};
use crate::fx::params::ParameterTable;
use crate::fx::resolver::Resolution;
use crate::fx::session::SlotKind;

/// Build the chain for `resolution`
///
/// # Errors
/// `Configuration` naming the full key when a slot parameter is missing.
pub fn build(resolution: &Resolution) -> Result<EffectsChain> {
    build_seeded(resolution, None)
}

/// Build the chain and record the seed its parameters were sampled with
pub fn build_seeded(resolution: &Resolution, seed: Option<u32>) -> Result<EffectsChain> {
    let session = resolution.session;
    let slots = session
        .slots()
        .iter()
        .map(|&kind| {
            let scoped = resolution
                .table
                .scoped(kind.prefix(), kind.required_keys(), kind.optional_keys())?;
            let unit = build_unit(kind, &scoped)?;
            debug!("{} slot {}: {}", session, kind, scoped);
            Ok(ChainSlot { kind, unit })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EffectsChain::new(
        session,
        resolution.preset.clone(),
        seed,
        resolution.table.clone(),
        slots,
    ))
}

/// Instantiate the unit for one slot from its prefix-stripped table
fn build_unit(kind: SlotKind, p: &ParameterTable) -> Result<Box<dyn Effect>> {
    let unit: Box<dyn Effect> = match kind {
        SlotKind::Gate => Box::new(Gate::from_table(p)?),
        SlotKind::HighPass => Box::new(Filter::high_pass(p.require("cutoff_hz")?)),
        SlotKind::DeEsser => Box::new(Filter::peak(
            p.require("freq_hz")?,
            p.require("cut_db")?,
            p.require("q")?,
        )),
        SlotKind::ToneFilter => Box::new(Filter::band_pass(
            p.require("low_cut_hz")?,
            p.require("high_cut_hz")?,
        )),
        SlotKind::Compressor => Box::new(Compressor::from_table(p)?),
        SlotKind::VocalEq => Box::new(ParametricEq::with_bands(vec![
            EqBand::peak(
                "presence",
                p.require("presence_freq_hz")?,
                p.require("presence_gain_db")?,
                p.require("presence_q")?,
            ),
            EqBand::peak(
                "air",
                p.require("air_freq_hz")?,
                p.require("air_gain_db")?,
                p.require("air_q")?,
            ),
        ])?),
        SlotKind::BassEq => Box::new(ParametricEq::with_bands(vec![
            EqBand::low_shelf(
                "low_shelf",
                p.require("low_shelf_freq_hz")?,
                p.require("low_shelf_gain_db")?,
                BUTTERWORTH_Q,
            ),
            EqBand::peak(
                "mid_scoop",
                p.require("mid_scoop_freq_hz")?,
                p.require("mid_scoop_gain_db")?,
                p.require("mid_scoop_q")?,
            ),
        ])?),
        SlotKind::SynthEq => Box::new(ParametricEq::with_bands(vec![
            EqBand::low_shelf(
                "low",
                p.require("low_freq_hz")?,
                p.require("low_gain_db")?,
                p.require("low_q")?,
            ),
            EqBand::peak(
                "mid",
                p.require("mid_freq_hz")?,
                p.require("mid_gain_db")?,
                p.require("mid_q")?,
            ),
            EqBand::high_shelf(
                "high",
                p.require("high_freq_hz")?,
                p.require("high_gain_db")?,
                p.require("high_q")?,
            ),
        ])?),
        SlotKind::Saturation | SlotKind::Distortion => Box::new(Distortion::from_table(p)?),
        SlotKind::Chorus => Box::new(Chorus::from_table(p)?),
        SlotKind::Delay => Box::new(Delay::from_table(p)?),
        SlotKind::Reverb => Box::new(Reverb::from_table(p)?),
        SlotKind::OutputGain => Box::new(Gain::from_table(p)?),
        SlotKind::Limiter => Box::new(Limiter::from_table(p)?),
    };
    Ok(unit)
}
