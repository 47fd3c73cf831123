//! FX chain engine
//!
//! Resolves per-session parameters, builds fixed-order effect chains and
//! applies them to caller audio:
//! - `params`: parameter and range tables
//! - `session`: session types and slot layouts
//! - `preset`: built-in defaults, presets and random ranges
//! - `resolver` / `random`: parameter resolution and seeded sampling
//! - `builder` / `chain`: chain construction and processing
//! - `contract`: orientation and channel fallback
//! - `rack`: the whole flow for one invocation

pub mod builder;
pub mod chain;
pub mod contract;
pub mod params;
pub mod preset;
pub mod random;
pub mod rack;
pub mod resolver;
pub mod session;

pub use builder::{build, build_seeded};
pub use chain::{ChainSettings, ChainSlot, EffectsChain, SlotSettings};
pub use contract::{
    adapt_channels, check_frame_count, normalize, restore_channels, Orientation, Restore,
};
pub use params::{ParamRange, ParameterTable, RangeTable};
pub use preset::{BassPreset, GuitarPreset, Preset, SynthPreset, VocalPreset, PRESET_VERSION};
pub use rack::{FxRack, RackOutput};
pub use random::{apply, randomize, sample, Sample, SeededRng};
pub use resolver::{resolve, PresetChoice, Resolution, UnknownPresetWarning, CUSTOM_PRESET_ID};
pub use session::{SessionType, SlotKind};
