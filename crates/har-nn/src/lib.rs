//! # HAR Neural Network Crate
//!
//! Numeric side of the real-time human-activity-recognition service: the
//! fitted feature scaler, the label decoder, and the classifier backends
//! that turn a window of inertial samples into an activity label.
//!
//! ## Features
//!
//! - **Standardization**: pre-fitted per-feature `(x - mean) / scale`
//! - **Label decoding**: classifier output index to textual label
//! - **Backends**: ONNX Runtime (feature `onnx`) and a scripted mock
//! - **Degraded mode**: per-component load status, inference refused until
//!   every artifact is present
//!
//! ## Example
//!
//! ```rust
//! use har_nn::{LabelDecoder, MockBackend, ModelBundle, StandardScaler, NUM_FEATURES};
//! use ndarray::Array2;
//!
//! let bundle = ModelBundle::new(
//!     Box::new(MockBackend::new(vec![0.2, 0.8])),
//!     StandardScaler::new(vec![0.0; NUM_FEATURES], vec![1.0; NUM_FEATURES]).unwrap(),
//!     LabelDecoder::new(vec!["Sitting".into(), "Walking".into()]).unwrap(),
//!     60,
//!     NUM_FEATURES,
//! );
//! let window = Array2::<f32>::zeros((60, NUM_FEATURES));
//! let prediction = bundle.classify(window.view()).unwrap();
//! assert_eq!(prediction.activity, "Walking");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bundle;
pub mod error;
pub mod inference;
pub mod label_decoder;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;
pub mod tensor;

pub use bundle::{ArtifactPaths, ComponentStatus, ModelBundle, Prediction};
pub use error::{NnError, NnResult};
pub use inference::{Backend, InferenceOptions, InferenceStats, MockBackend};
pub use label_decoder::LabelDecoder;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxBackend, OnnxSession};
pub use scaler::StandardScaler;
pub use tensor::{argmax, Tensor, TensorShape};

/// Number of features per sample: 3-axis acceleration then 3-axis angular velocity
pub const NUM_FEATURES: usize = 6;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
