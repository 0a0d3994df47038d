//! Error types for the streaming service.
//!
//! ```text
//! StreamError
//! ├── MissingField / InvalidField   malformed record, dropped
//! ├── InsufficientData              buffer shorter than requested
//! ├── ShapeMismatch                 window invariant violated, dropped
//! ├── Scaling / Inference           numeric failure, window dropped
//! └── ComponentLoad / NotReady      degraded mode
//! ```
//!
//! Every per-message error is contained to its message: the dispatcher logs
//! it and moves on.

use std::path::PathBuf;

use har_nn::NnError;
use thiserror::Error;

/// Result alias for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors raised while handling a connection's events
#[derive(Debug, Error)]
pub enum StreamError {
    /// Inbound record lacks one or more canonical sensor keys
    #[error("Missing sensor fields: {}", missing.join(", "))]
    MissingField {
        /// Every absent key, in canonical order
        missing: Vec<String>,
    },

    /// Inbound record has a key whose value is not a finite number
    #[error("Invalid value for '{key}': {reason}")]
    InvalidField {
        /// Offending key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// Fewer samples buffered than requested
    #[error("Insufficient data: need {required} samples, have {available}")]
    InsufficientData {
        /// Samples requested
        required: usize,
        /// Samples present
        available: usize,
    },

    /// Window does not have the `(window_size, features)` shape
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected dimensions
        expected: Vec<usize>,
        /// Actual dimensions
        actual: Vec<usize>,
    },

    /// Standardization failed
    #[error("Scaling error: {0}")]
    Scaling(String),

    /// Classifier or label decoding failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// An artifact failed to load
    #[error("Component load error: {0}")]
    ComponentLoad(String),

    /// Inference refused because components are missing
    #[error("Prediction components not ready")]
    NotReady,
}

impl StreamError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::MissingField { .. } => "MISSING_FIELD",
            StreamError::InvalidField { .. } => "INVALID_FIELD",
            StreamError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            StreamError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            StreamError::Scaling(_) => "SCALING_ERROR",
            StreamError::Inference(_) => "INFERENCE_ERROR",
            StreamError::ComponentLoad(_) => "COMPONENT_LOAD_ERROR",
            StreamError::NotReady => "NOT_READY",
        }
    }

    /// True for errors caused by the inbound record itself
    pub fn is_malformed_record(&self) -> bool {
        matches!(
            self,
            StreamError::MissingField { .. } | StreamError::InvalidField { .. }
        )
    }
}

impl From<NnError> for StreamError {
    fn from(err: NnError) -> Self {
        match err {
            NnError::ShapeMismatch { expected, actual } => {
                StreamError::ShapeMismatch { expected, actual }
            }
            NnError::Scaling(msg) => StreamError::Scaling(msg),
            NnError::NotReady(_) => StreamError::NotReady,
            NnError::ModelLoad { .. } | NnError::BackendUnavailable(_) => {
                StreamError::ComponentLoad(err.to_string())
            }
            other => StreamError::Inference(other.to_string()),
        }
    }
}

/// Errors produced while loading or validating [`crate::config::HarConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an unusable value
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Dotted field path
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Construct an [`ConfigError::InvalidValue`]
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
