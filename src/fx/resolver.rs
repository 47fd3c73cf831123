//! Parameter resolution
//!
//! Layers session defaults, then a preset or custom table, then explicit
//! overrides. Unknown preset names fall back to the session default with a
//! warning instead of failing.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};
use crate::fx::params::ParameterTable;
use crate::fx::preset::{defaults, Preset};
use crate::fx::session::SessionType;

/// Id reported for chains built from a custom table
pub const CUSTOM_PRESET_ID: &str = "custom";

/// What sits in the preset position of the resolution chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetChoice {
    /// A preset id, looked up in the session's closed preset set
    Named(String),
    /// A caller-supplied table layered over the session defaults
    Custom(ParameterTable),
}

impl PresetChoice {
    pub fn named(name: impl Into<String>) -> Self {
        PresetChoice::Named(name.into())
    }

    /// The named default preset of a session
    pub fn default_for(session: SessionType) -> Self {
        PresetChoice::Named(Preset::default_for(session).id().to_string())
    }
}

impl From<&str> for PresetChoice {
    fn from(name: &str) -> Self {
        PresetChoice::Named(name.to_string())
    }
}

impl From<ParameterTable> for PresetChoice {
    fn from(table: ParameterTable) -> Self {
        PresetChoice::Custom(table)
    }
}

/// Non-fatal notice that a preset name was not registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownPresetWarning {
    pub session: SessionType,
    pub requested: String,
    pub fallback: &'static str,
}

impl fmt::Display for UnknownPresetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} preset '{}', using '{}'",
            self.session, self.requested, self.fallback
        )
    }
}

/// Output of [`resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub session: SessionType,
    /// Fully merged parameter table
    pub table: ParameterTable,
    /// Effective preset id
    pub preset: String,
    pub warnings: Vec<UnknownPresetWarning>,
}

/// Resolve the parameter table for one chain
///
/// Precedence, lowest first: session defaults, preset or custom table,
/// overrides. Every key a slot requires must be present afterwards, and
/// every custom or override key must belong to some slot of the session.
pub fn resolve(
    session: SessionType,
    choice: &PresetChoice,
    overrides: &ParameterTable,
) -> Result<Resolution> {
    let mut warnings = Vec::new();
    let mut table = defaults(session);

    let preset = match choice {
        PresetChoice::Named(name) => {
            let preset = match Preset::parse(session, name) {
                Some(preset) => preset,
                None => {
                    let fallback = Preset::default_for(session);
                    let warning = UnknownPresetWarning {
                        session,
                        requested: name.clone(),
                        fallback: fallback.id(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    fallback
                }
            };
            table.merge(&preset.changes());
            preset.id().to_string()
        }
        PresetChoice::Custom(custom) => {
            check_keys(session, custom)?;
            table.merge(custom);
            CUSTOM_PRESET_ID.to_string()
        }
    };

    check_keys(session, overrides)?;
    table.merge(overrides);

    for key in session.required_keys() {
        table.require(&key)?;
    }

    Ok(Resolution {
        session,
        table,
        preset,
        warnings,
    })
}

fn check_keys(session: SessionType, table: &ParameterTable) -> Result<()> {
    for (key, value) in table.iter() {
        if !session.accepts_key(key) {
            return Err(FxError::config(
                key,
                format!("not a parameter of the {} session", session),
            ));
        }
        if !value.is_finite() {
            return Err(FxError::config(key, "value must be finite"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_named_preset_applies_changes() {
        let res = resolve(SessionType::Guitar, &"crunch".into(), &ParameterTable::new()).unwrap();
        assert_eq!(res.preset, "crunch");
        assert_eq!(res.table.get("drive_db"), Some(12.0));
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_unknown_preset_falls_back_with_warning() {
        let empty = ParameterTable::new();
        let res = resolve(SessionType::Vocal, &"nonexistent".into(), &empty).unwrap();
        let default = resolve(SessionType::Vocal, &"default".into(), &empty).unwrap();

        assert_eq!(res.table, default.table);
        assert_eq!(res.preset, "default");
        assert_eq!(res.warnings.len(), 1);
        assert_eq!(res.warnings[0].requested, "nonexistent");
        assert_eq!(res.warnings[0].fallback, "default");
    }

    #[test]
    fn test_unknown_guitar_preset_uses_clean() {
        let res = resolve(SessionType::Guitar, &"metal".into(), &ParameterTable::new()).unwrap();
        assert_eq!(res.preset, "clean");
        assert_eq!(res.table.get("drive_db"), Some(0.0));
    }

    #[test]
    fn test_overrides_win_over_preset() {
        let overrides = ParameterTable::from_pairs(&[("drive_db", 18.0)]);
        let res = resolve(SessionType::Guitar, &"crunch".into(), &overrides).unwrap();
        assert_eq!(res.table.get("drive_db"), Some(18.0));
        assert_eq!(res.table.get("chorus_mix"), Some(0.1));
    }

    #[test]
    fn test_custom_table_layers_over_defaults() {
        let custom = ParameterTable::from_pairs(&[("comp_ratio", 8.0)]);
        let res = resolve(SessionType::Bass, &custom.into(), &ParameterTable::new()).unwrap();
        assert_eq!(res.preset, CUSTOM_PRESET_ID);
        assert_eq!(res.table.get("comp_ratio"), Some(8.0));
        assert_eq!(res.table.get("drive_db"), Some(8.0));
    }

    #[test]
    fn test_unknown_override_key_is_rejected() {
        let overrides = ParameterTable::from_pairs(&[("comp_ration", 4.0)]);
        let err = resolve(SessionType::Vocal, &"default".into(), &overrides).unwrap_err();
        assert!(matches!(err, FxError::Configuration { ref param, .. } if param == "comp_ration"));
    }

    #[test]
    fn test_non_finite_override_is_rejected() {
        let overrides = ParameterTable::from_pairs(&[("comp_ratio", f32::NAN)]);
        assert!(resolve(SessionType::Vocal, &"default".into(), &overrides).is_err());
    }

    #[test]
    fn test_resolution_is_pure() {
        let a = resolve(SessionType::Synth, &"warm".into(), &ParameterTable::new()).unwrap();
        let b = resolve(SessionType::Synth, &"warm".into(), &ParameterTable::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_warning_display() {
        let warning = UnknownPresetWarning {
            session: SessionType::Bass,
            requested: "slap".to_string(),
            fallback: "default",
        };
        assert_eq!(warning.to_string(), "unknown bass preset 'slap', using 'default'");
    }
}
