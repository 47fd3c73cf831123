//! Error handling for StemFX
//!
//! Every error carries a stable code and recovery suggestions. Unknown
//! preset names are not errors; see [`crate::fx::UnknownPresetWarning`].

use thiserror::Error;

/// Result type alias for StemFX operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for StemFX operations
#[derive(Error, Debug)]
pub enum FxError {
    // Engine Errors
    #[error("Configuration error for '{param}': {reason}")]
    Configuration { param: String, reason: String },

    #[error("Shape error for buffer {shape:?}: {reason}")]
    Shape { shape: Vec<usize>, reason: String },

    #[error("DSP overflow: effect '{effect}' produced invalid audio (NaN/Inf)")]
    DspOverflow { effect: String },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Separation Errors
    #[error("Separation failed for stem '{stem}': {reason}")]
    Separation { stem: String, reason: String },

    #[error("Separation unavailable: {reason}")]
    SeparationUnavailable { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Shorthand for a configuration error on a named parameter
    pub fn config(param: impl Into<String>, reason: impl Into<String>) -> Self {
        FxError::Configuration {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a shape error
    pub fn shape(shape: &[usize], reason: impl Into<String>) -> Self {
        FxError::Shape {
            shape: shape.to_vec(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Configuration { .. } => "CONFIGURATION_ERROR",
            FxError::Shape { .. } => "SHAPE_ERROR",
            FxError::DspOverflow { .. } => "DSP_OVERFLOW",
            FxError::FileNotFound { .. } => "FILE_NOT_FOUND",
            FxError::InvalidAudio { .. } => "INVALID_AUDIO",
            FxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FxError::EmptyAudio => "EMPTY_AUDIO",
            FxError::Separation { .. } => "SEPARATION_ERROR",
            FxError::SeparationUnavailable { .. } => "SEPARATION_UNAVAILABLE",
            FxError::Io(_) => "IO_ERROR",
            FxError::Wav(_) => "WAV_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by retrying with different input
    ///
    /// Configuration and shape errors are never recovered silently.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FxError::FileNotFound { .. }
                | FxError::InvalidAudio { .. }
                | FxError::UnsupportedFormat { .. }
                | FxError::Separation { .. }
                | FxError::SeparationUnavailable { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::Configuration { .. } => vec![
                "Check the parameter name against `stemfx-cli presets`",
                "Make sure every range has min <= max",
                "Valid sessions: vocal, guitar, bass, synth",
            ],
            FxError::Shape { .. } => vec![
                "Pass audio as (samples,), (channels, samples) or (samples, channels)",
                "Make sure the buffer has more samples than channels",
            ],
            FxError::DspOverflow { .. } => vec![
                "The effect settings may be too extreme",
                "Try reducing drive or feedback amounts",
            ],
            FxError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            FxError::InvalidAudio { .. } => vec![
                "Try converting the file to WAV format first",
                "The file may be corrupted - try re-exporting from source",
            ],
            FxError::UnsupportedFormat { .. } => vec![
                "Convert to 16/24/32-bit PCM or 32-bit float WAV",
            ],
            FxError::Separation { .. } | FxError::SeparationUnavailable { .. } => vec![
                "Check that the separation bridge is running",
                "Pass --stems-dir to use stems separated elsewhere",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FxError::config("comp_ratio", "missing");
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let err = FxError::shape(&[4, 4], "ambiguous");
        assert_eq!(err.error_code(), "SHAPE_ERROR");
    }

    #[test]
    fn test_configuration_error_names_parameter() {
        let err = FxError::config("gate_threshold_db", "no default");
        assert!(err.to_string().contains("gate_threshold_db"));
        assert!(!err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_shape_error_reports_shape() {
        let err = FxError::shape(&[2, 2], "both axes equal");
        assert!(err.to_string().contains("[2, 2]"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_separation_is_recoverable() {
        let err = FxError::Separation {
            stem: "bass".to_string(),
            reason: "missing".to_string(),
        };
        assert!(err.is_recoverable());
    }
}
