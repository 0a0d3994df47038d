//! Error types for the activity-recognition numeric pipeline.

use thiserror::Error;

/// Result type alias for numeric pipeline operations
pub type NnResult<T> = Result<T, NnError>;

/// Errors raised while loading artifacts or transforming/classifying a window
#[derive(Error, Debug)]
pub enum NnError {
    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model, scaler or label decoder failed to load
    #[error("Failed to load {component}: {message}")]
    ModelLoad {
        /// Which artifact failed ("model", "scaler", "label encoder")
        component: &'static str,
        /// Description of the failure
        message: String,
    },

    /// Classifier invocation or label decoding failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Feature-wise standardization failed
    #[error("Scaling failed: {0}")]
    Scaling(String),

    /// Shape mismatch error
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// A component of the bundle is not loaded
    #[error("Component not ready: {0}")]
    NotReady(&'static str),

    /// Backend not available in this build
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),
}

impl NnError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        NnError::Config(msg.into())
    }

    /// Create a load error for the named component
    pub fn model_load<S: Into<String>>(component: &'static str, msg: S) -> Self {
        NnError::ModelLoad {
            component,
            message: msg.into(),
        }
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        NnError::Inference(msg.into())
    }

    /// Create a scaling error
    pub fn scaling<S: Into<String>>(msg: S) -> Self {
        NnError::Scaling(msg.into())
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        NnError::ShapeMismatch { expected, actual }
    }

    /// Stable machine-readable code for logs and wire messages
    pub fn code(&self) -> &'static str {
        match self {
            NnError::Config(_) => "CONFIG_ERROR",
            NnError::ModelLoad { .. } => "COMPONENT_LOAD_ERROR",
            NnError::Inference(_) => "INFERENCE_ERROR",
            NnError::Scaling(_) => "SCALING_ERROR",
            NnError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            NnError::NotReady(_) => "NOT_READY",
            NnError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
        }
    }
}
