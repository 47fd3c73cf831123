//! Parameter and range tables
//!
//! A [`ParameterTable`] maps parameter names such as `gate_threshold_db`
//! to numeric values. Keys are kept sorted so that iteration order (and
//! therefore randomization order and serialized output) never depends on
//! insertion order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};

/// Flat mapping from parameter name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable(BTreeMap<String, f32>);

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from static `(name, value)` pairs
    pub fn from_pairs(pairs: &[(&str, f32)]) -> Self {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }

    /// Value for `key`, or a configuration error naming the key
    pub fn require(&self, key: &str) -> Result<f32> {
        self.get(key)
            .ok_or_else(|| FxError::config(key, "required parameter has no value"))
    }

    /// Value for `key`, or `default` when absent
    pub fn get_or(&self, key: &str, default: f32) -> f32 {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f32) -> Option<f32> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Overlay `other` onto this table; keys in `other` win
    pub fn merge(&mut self, other: &ParameterTable) {
        for (key, value) in other.iter() {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Copy with `other` layered on top
    pub fn merged(&self, other: &ParameterTable) -> ParameterTable {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Slot-scoped view of the table
    ///
    /// Picks `prefix + key` for every required and optional key and strips
    /// the prefix. A missing required key is a configuration error naming
    /// the full key.
    pub fn scoped(
        &self,
        prefix: &str,
        required: &[&str],
        optional: &[&str],
    ) -> Result<ParameterTable> {
        let mut scoped = ParameterTable::new();
        for key in required {
            let full = format!("{}{}", prefix, key);
            scoped.insert(*key, self.require(&full)?);
        }
        for key in optional {
            if let Some(value) = self.get(&format!("{}{}", prefix, key)) {
                scoped.insert(*key, value);
            }
        }
        Ok(scoped)
    }
}

impl FromIterator<(String, f32)> for ParameterTable {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ParameterTable {
    type Item = (&'a String, &'a f32);
    type IntoIter = std::collections::btree_map::Iter<'a, String, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ParameterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Closed interval `[min, max]` for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reject `min > max` and non-finite bounds
    pub fn validate(&self, key: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(FxError::config(
                key,
                format!("range bounds must be finite, got [{}, {}]", self.min, self.max),
            ));
        }
        if self.min > self.max {
            return Err(FxError::config(
                key,
                format!("malformed range: min {} > max {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

impl From<[f32; 2]> for ParamRange {
    fn from(pair: [f32; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<ParamRange> for [f32; 2] {
    fn from(range: ParamRange) -> Self {
        [range.min, range.max]
    }
}

/// Mapping from parameter name to its randomization interval
///
/// Parameters without a range are never randomized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable(BTreeMap<String, ParamRange>);

impl RangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, f32, f32)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, min, max)| ((*k).to_string(), ParamRange::new(*min, *max)))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, min: f32, max: f32) {
        self.0.insert(key.into(), ParamRange::new(min, max));
    }

    pub fn get(&self, key: &str) -> Option<ParamRange> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ranges in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamRange)> {
        self.0.iter().map(|(k, r)| (k.as_str(), *r))
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(key, range)| range.validate(key))
    }
}
