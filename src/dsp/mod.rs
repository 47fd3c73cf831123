//! DSP Effects Library
//!
//! The transform units that session chains are assembled from. All units
//! implement the `Effect` trait and process a channel-first buffer in place.

mod biquad;
mod chorus;
mod compressor;
mod delay;
mod distortion;
mod effect;
mod eq;
mod filter;
mod gain;
mod gate;
mod limiter;
mod reverb;

pub use biquad::{BiquadSection, FilterType, BUTTERWORTH_Q};
pub use chorus::{Chorus, ChorusSettings};
pub use compressor::{Compressor, CompressorSettings};
pub use delay::Delay;
pub use distortion::Distortion;
pub use effect::{ChannelRequirement, Effect, EffectParams};
pub use eq::{EqBand, ParametricEq, MAX_BANDS};
pub use filter::{Filter, FilterMode};
pub use gain::Gain;
pub use gate::{Gate, GateSettings};
pub use limiter::Limiter;
pub use reverb::{Reverb, ReverbSettings};
