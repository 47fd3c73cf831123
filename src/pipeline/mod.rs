//! Stem pipeline
//!
//! File-level orchestration around the FX engine:
//! - Separation of a mixture into vocals, guitar, bass and piano stems
//! - Per-stem processing with the matching session chain
//! - Parallel batch processing of single files
//! - A run manifest with checksums of everything written

pub mod batch;
pub mod bridge;
pub mod manifest;
pub mod run;
pub mod separator;
pub mod stem;

pub use batch::{batch_process, collect_inputs, output_path, BatchFailure, BatchReport};
pub use bridge::{BridgeSeparator, BRIDGE_URL_ENV, DEFAULT_BRIDGE_URL};
pub use manifest::{ManifestEntry, RunManifest, MANIFEST_FILE};
pub use run::{
    process_buffer, process_file, process_stem, run_pipeline, PipelineReport, SessionPresets,
    SessionSetup, StemFailure,
};
pub use separator::{
    conform_stem, stem_file, validate_stem, validate_stems, DirectorySeparator,
    PassthroughSeparator, Separator,
};
pub use stem::{Stem, StemMap};
