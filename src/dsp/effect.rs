//! Effect trait definition
//!
//! Every transform unit in a chain implements [`Effect`]. The engine never
//! looks inside a unit; it prepares it, asks what channel layout it needs,
//! and runs it.

use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters common to all effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectParams {
    /// Unique identifier for this effect instance
    pub id: String,
    /// Whether the effect is enabled. A disabled effect is a bypass.
    pub enabled: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: true,
        }
    }
}

/// Channel layout an effect can process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRequirement {
    /// Works per channel on any channel count
    #[default]
    Any,
    /// Needs exactly one channel
    Mono,
    /// Needs exactly two channels
    Stereo,
}

impl ChannelRequirement {
    /// Whether a buffer with `channels` channels can be processed as-is
    pub fn accepts(&self, channels: usize) -> bool {
        match self {
            ChannelRequirement::Any => channels >= 1,
            ChannelRequirement::Mono => channels == 1,
            ChannelRequirement::Stereo => channels == 2,
        }
    }
}

/// Base trait for all DSP effects
///
/// Effects process audio buffers in-place and never change the channel
/// count or the number of samples.
pub trait Effect: Send + Sync {
    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Prepare the effect for processing at `sample_rate`
    fn prepare(&mut self, sample_rate: u32);

    /// Reset effect state
    ///
    /// Clears any internal buffers/state (e.g., filter history, delay lines).
    fn reset(&mut self);

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Get the unique instance ID
    fn id(&self) -> &str;

    /// Check if effect is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Channel layout this effect needs
    fn channel_requirement(&self) -> ChannelRequirement {
        ChannelRequirement::Any
    }

    /// Get all parameters as JSON
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: f32) -> Result<()>;

    /// Clone the effect into a boxed trait object
    fn box_clone(&self) -> Box<dyn Effect>;
}

impl Clone for Box<dyn Effect> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl std::fmt::Debug for dyn Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("type", &self.effect_type())
            .field("enabled", &self.is_enabled())
            .field("params", &self.get_params())
            .finish()
    }
}

/// Error for a parameter name an effect does not know
pub(crate) fn unknown_param(effect: &str, name: &str) -> FxError {
    FxError::config(name, format!("unknown parameter for {}", effect))
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($type:ty, $effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn id(&self) -> &str {
            &self.params.id
        }

        fn is_enabled(&self) -> bool {
            self.params.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.params.enabled = enabled;
        }

        fn box_clone(&self) -> Box<dyn $crate::dsp::Effect> {
            Box::new(self.clone())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_requirement_accepts() {
        assert!(ChannelRequirement::Any.accepts(1));
        assert!(ChannelRequirement::Any.accepts(6));
        assert!(!ChannelRequirement::Any.accepts(0));
        assert!(ChannelRequirement::Mono.accepts(1));
        assert!(!ChannelRequirement::Mono.accepts(2));
        assert!(ChannelRequirement::Stereo.accepts(2));
        assert!(!ChannelRequirement::Stereo.accepts(1));
    }

    #[test]
    fn test_effect_params_have_unique_ids() {
        let a = EffectParams::default();
        let b = EffectParams::default();
        assert_ne!(a.id, b.id);
        assert!(a.enabled);
    }
}
