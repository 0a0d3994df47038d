//! Integration tests for loading artifacts from disk and running the
//! numeric pipeline end to end.
//!
//! Test matrix:
//! - Scaler and label encoder load from JSON, model missing => degraded
//! - Bare-array and wrapped label files
//! - Malformed artifacts are rejected per component
//! - Exact standardization values reach the backend
//! - Window shape is enforced before the backend is called

use std::path::{Path, PathBuf};
use std::sync::Arc;

use approx::assert_relative_eq;
use har_nn::{
    ArtifactPaths, Backend, InferenceOptions, LabelDecoder, ModelBundle, NnError, NnResult,
    StandardScaler, Tensor,
};
use ndarray::Array2;
use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const SCALER_JSON: &str = r#"{
    "mean": [1.0, 2.0, 3.0, 0.0, 0.0, 0.0],
    "scale": [2.0, 2.0, 2.0, 0.5, 0.5, 0.5],
    "n_features_in": 6
}"#;

/// Backend that records its input and answers with fixed probabilities
struct CapturingBackend {
    seen: Mutex<Option<Tensor>>,
    output: Vec<f32>,
}

impl Backend for CapturingBackend {
    fn name(&self) -> &str {
        "capturing"
    }

    fn run(&self, input: &Tensor) -> NnResult<Tensor> {
        *self.seen.lock() = Some(input.clone());
        let n = self.output.len();
        Ok(Tensor::from_array2(
            Array2::from_shape_vec((1, n), self.output.clone()).unwrap(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn missing_model_leaves_bundle_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths {
        model: dir.path().join("absent.onnx"),
        scaler: write(dir.path(), "scaler.json", SCALER_JSON),
        label_encoder: write(dir.path(), "labels.json", r#"{"classes": ["A", "B", "C"]}"#),
    };

    let bundle = ModelBundle::load(&paths, &InferenceOptions::default(), 60, 6);
    let status = bundle.status();
    assert!(!status.model_loaded);
    assert!(status.scaler_loaded);
    assert!(status.encoder_loaded);
    assert!(!bundle.is_ready());
    assert_eq!(bundle.classes(), vec!["A", "B", "C"]);

    let window = Array2::<f32>::zeros((60, 6));
    assert!(matches!(
        bundle.classify(window.view()),
        Err(NnError::NotReady(_))
    ));
}

#[test]
fn bare_array_label_file_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "labels.json", r#"["Walking", "Sitting"]"#);
    let decoder = LabelDecoder::from_json(&path).unwrap();
    assert_eq!(decoder.classes(), &["Walking", "Sitting"]);
}

#[test]
fn malformed_artifacts_are_rejected_per_component() {
    let dir = tempfile::tempdir().unwrap();
    let scaler = write(dir.path(), "scaler.json", r#"{"mean": [0.0], "scale": [0.0]}"#);
    let labels = write(dir.path(), "labels.json", r#"{"classes": []}"#);

    let err = StandardScaler::from_json(&scaler).unwrap_err();
    assert_eq!(err.code(), "COMPONENT_LOAD_ERROR");
    let err = LabelDecoder::from_json(&labels).unwrap_err();
    assert_eq!(err.code(), "COMPONENT_LOAD_ERROR");

    let declared = write(
        dir.path(),
        "declared.json",
        r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0], "n_features_in": 3}"#,
    );
    assert!(StandardScaler::from_json(&declared).is_err());
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn standardized_window_reaches_backend() {
    let dir = tempfile::tempdir().unwrap();
    let scaler = StandardScaler::from_json(write(dir.path(), "scaler.json", SCALER_JSON)).unwrap();
    let decoder = LabelDecoder::new(vec!["A".into(), "B".into()]).unwrap();
    let backend = Arc::new(CapturingBackend {
        seen: Mutex::new(None),
        output: vec![0.25, 0.75],
    });
    let bundle = ModelBundle::new(Box::new(backend.clone()), scaler, decoder, 3, 6);

    let window = Array2::from_shape_fn((3, 6), |(r, c)| (r * 6 + c) as f32);
    let prediction = bundle.classify(window.view()).unwrap();
    assert_eq!(prediction.activity, "B");
    assert_relative_eq!(prediction.confidence, 0.75);

    let seen = backend.seen.lock().clone().unwrap();
    assert_eq!(seen.shape().dims(), &[1, 3, 6]);
    let input = seen.as_array3().unwrap();
    // row 1: [6, 7, 8, 9, 10, 11]
    assert_relative_eq!(input[[0, 1, 0]], (6.0 - 1.0) / 2.0);
    assert_relative_eq!(input[[0, 1, 2]], (8.0 - 3.0) / 2.0);
    assert_relative_eq!(input[[0, 1, 5]], 11.0 / 0.5);
    assert_relative_eq!(input[[0, 2, 3]], 15.0 / 0.5);
}

#[test]
fn wrong_window_shape_never_reaches_backend() {
    let backend = Arc::new(CapturingBackend {
        seen: Mutex::new(None),
        output: vec![1.0],
    });
    let bundle = ModelBundle::new(
        Box::new(backend.clone()),
        StandardScaler::new(vec![0.0; 6], vec![1.0; 6]).unwrap(),
        LabelDecoder::new(vec!["A".into()]).unwrap(),
        60,
        6,
    );

    let short = Array2::<f32>::zeros((59, 6));
    assert!(matches!(
        bundle.classify(short.view()),
        Err(NnError::ShapeMismatch { .. })
    ));
    assert!(backend.seen.lock().is_none());
    assert_eq!(bundle.stats().failed_inferences, 1);
}
