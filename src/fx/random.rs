//! Seeded parameter randomization
//!
//! Each call owns its own MT19937 stream derived from the seed alone, so
//! results are identical across calls, threads and process restarts.

use log::debug;
use rand_mt::Mt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fx::params::{ParameterTable, RangeTable};
use crate::fx::preset::ranges;
use crate::fx::session::SessionType;

/// Per-call MT19937 stream
pub struct SeededRng {
    mt: Mt,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { mt: Mt::new(seed) }
    }

    /// Uniform f64 in [0, 1) with 53 bits of precision
    pub fn random(&mut self) -> f64 {
        let a = self.mt.next_u32() >> 5;
        let b = self.mt.next_u32() >> 6;
        (a as f64 * 67108864.0 + b as f64) / 9007199254740992.0
    }

    /// Uniform f64 in [low, high)
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.random()
    }
}

/// Values drawn by one randomization call, with the seed that drew them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub values: ParameterTable,
    pub seed: u32,
}

/// Draw one value per range, visiting keys in sorted order
///
/// A range with `min == max` yields exactly `min`.
pub fn sample(ranges: &RangeTable, seed: u32) -> Result<Sample> {
    ranges.validate()?;

    let mut rng = SeededRng::new(seed);
    let mut values = ParameterTable::new();
    for (key, range) in ranges.iter() {
        let value = if range.min == range.max {
            range.min
        } else {
            rng.uniform(range.min as f64, range.max as f64) as f32
        };
        values.insert(key, value.clamp(range.min, range.max));
    }

    debug!("seed {} sampled {}", seed, values);
    Ok(Sample { values, seed })
}

/// Sample a session's built-in ranges
pub fn randomize(session: SessionType, seed: u32) -> Result<Sample> {
    sample(&ranges(session), seed)
}

/// Overlay sampled values on a resolved table
///
/// Keys without a sampled value keep their resolved value.
pub fn apply(table: &ParameterTable, sample: &Sample) -> ParameterTable {
    table.merged(&sample.values)
}
