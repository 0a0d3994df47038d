//! The model bundle: classifier, fitted scaler and label decoder.
//!
//! Each component loads independently. A bundle with any component missing
//! is *degraded*: it still reports which components are present (and the
//! known class labels, when the decoder loaded) but refuses to classify.

use crate::error::{NnError, NnResult};
use crate::inference::{timed, Backend, InferenceOptions, InferenceStats};
use crate::label_decoder::LabelDecoder;
use crate::scaler::StandardScaler;
use crate::tensor::{argmax, Tensor};
use ndarray::ArrayView2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Locations of the three artifacts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Classifier model file
    pub model: PathBuf,
    /// Fitted scaler (JSON)
    pub scaler: PathBuf,
    /// Label encoder classes (JSON)
    pub label_encoder: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/har_model.onnx"),
            scaler: PathBuf::from("models/har_scaler.json"),
            label_encoder: PathBuf::from("models/har_label_encoder.json"),
        }
    }
}

/// Readiness flags reported to observers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentStatus {
    /// Classifier loaded
    pub model_loaded: bool,
    /// Scaler loaded
    pub scaler_loaded: bool,
    /// Label encoder loaded
    pub encoder_loaded: bool,
    /// Configuration warnings raised while loading
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ComponentStatus {
    /// True when every component is loaded
    pub fn is_ready(&self) -> bool {
        self.model_loaded && self.scaler_loaded && self.encoder_loaded
    }
}

/// A decoded classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Decoded class label
    pub activity: String,
    /// Probability of the selected class, in `[0, 1]`
    pub confidence: f32,
    /// Index of the selected class
    pub class_index: usize,
    /// Wall time spent in the backend
    pub duration_ms: f64,
}

/// Classifier, scaler and decoder shared read-only by every stream
pub struct ModelBundle {
    classifier: Option<Box<dyn Backend>>,
    scaler: Option<StandardScaler>,
    decoder: Option<LabelDecoder>,
    window_size: usize,
    num_features: usize,
    warnings: Vec<String>,
    stats: Mutex<InferenceStats>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("classifier", &self.classifier.as_ref().map(|c| c.name().to_string()))
            .field("scaler", &self.scaler)
            .field("decoder", &self.decoder)
            .field("window_size", &self.window_size)
            .field("num_features", &self.num_features)
            .finish()
    }
}

impl ModelBundle {
    /// Assemble a bundle from already-built parts.
    ///
    /// Records a configuration warning when the scaler was fitted on a
    /// different feature count than `num_features`.
    pub fn from_parts(
        classifier: Option<Box<dyn Backend>>,
        scaler: Option<StandardScaler>,
        decoder: Option<LabelDecoder>,
        window_size: usize,
        num_features: usize,
    ) -> Self {
        let mut warnings = Vec::new();
        if let Some(s) = &scaler {
            if s.n_features_in() != num_features {
                let msg = format!(
                    "scaler expects {} features but {} are configured",
                    s.n_features_in(),
                    num_features
                );
                warn!("{}", msg);
                warnings.push(msg);
            }
        }
        Self {
            classifier,
            scaler,
            decoder,
            window_size,
            num_features,
            warnings,
            stats: Mutex::new(InferenceStats::default()),
        }
    }

    /// A fully ready bundle
    pub fn new(
        classifier: Box<dyn Backend>,
        scaler: StandardScaler,
        decoder: LabelDecoder,
        window_size: usize,
        num_features: usize,
    ) -> Self {
        Self::from_parts(
            Some(classifier),
            Some(scaler),
            Some(decoder),
            window_size,
            num_features,
        )
    }

    /// Load every artifact, keeping whatever succeeds.
    ///
    /// Never fails: load errors are logged and leave the matching component
    /// absent, which puts the bundle in degraded mode.
    pub fn load(
        paths: &ArtifactPaths,
        options: &InferenceOptions,
        window_size: usize,
        num_features: usize,
    ) -> Self {
        info!("Loading prediction components");

        let classifier = match load_backend(&paths.model, options) {
            Ok(backend) => {
                info!(backend = backend.name(), "Classifier loaded");
                if options.warmup {
                    if let Err(e) = backend.warmup(window_size, num_features) {
                        warn!(error = %e, "Classifier warmup failed");
                    }
                }
                Some(backend)
            }
            Err(e) => {
                error!(path = %paths.model.display(), error = %e, "Classifier failed to load");
                None
            }
        };
        let scaler = StandardScaler::from_json(&paths.scaler)
            .map_err(|e| error!(path = %paths.scaler.display(), error = %e, "Scaler failed to load"))
            .ok();
        let decoder = LabelDecoder::from_json(&paths.label_encoder)
            .map_err(|e| {
                error!(path = %paths.label_encoder.display(), error = %e, "Label encoder failed to load")
            })
            .ok();

        let bundle = Self::from_parts(classifier, scaler, decoder, window_size, num_features);
        if bundle.is_ready() {
            info!("All prediction components loaded");
        } else {
            warn!(status = ?bundle.status(), "Running degraded: inference disabled");
        }
        bundle
    }

    /// Readiness flags
    pub fn status(&self) -> ComponentStatus {
        ComponentStatus {
            model_loaded: self.classifier.is_some(),
            scaler_loaded: self.scaler.is_some(),
            encoder_loaded: self.decoder.is_some(),
            warnings: self.warnings.clone(),
        }
    }

    /// True when every component is loaded
    pub fn is_ready(&self) -> bool {
        self.classifier.is_some() && self.scaler.is_some() && self.decoder.is_some()
    }

    /// Known class labels, empty when the decoder did not load
    pub fn classes(&self) -> Vec<String> {
        self.decoder
            .as_ref()
            .map(|d| d.classes().to_vec())
            .unwrap_or_default()
    }

    /// Window length the bundle expects
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Feature count the bundle expects
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Snapshot of inference timing statistics
    pub fn stats(&self) -> InferenceStats {
        self.stats.lock().clone()
    }

    /// Validate, standardize and reshape a window to `(1, window, features)`
    pub fn prepare(&self, window: ArrayView2<'_, f32>) -> NnResult<Tensor> {
        let scaler = self.scaler.as_ref().ok_or(NnError::NotReady("scaler"))?;
        let expected = (self.window_size, self.num_features);
        if window.dim() != expected {
            return Err(NnError::shape_mismatch(
                vec![expected.0, expected.1],
                vec![window.nrows(), window.ncols()],
            ));
        }
        let scaled = scaler.transform(window)?;
        let batched = scaled
            .into_shape((1, self.window_size, self.num_features))
            .map_err(|e| NnError::scaling(format!("reshape failed: {}", e)))?;
        Ok(Tensor::from_array3(batched))
    }

    /// Run the full transform and classification on one window
    pub fn classify(&self, window: ArrayView2<'_, f32>) -> NnResult<Prediction> {
        let result = self.classify_inner(window);
        if result.is_err() {
            self.stats.lock().record_failure();
        }
        result
    }

    fn classify_inner(&self, window: ArrayView2<'_, f32>) -> NnResult<Prediction> {
        let classifier = self.classifier.as_ref().ok_or(NnError::NotReady("model"))?;
        let decoder = self.decoder.as_ref().ok_or(NnError::NotReady("label encoder"))?;

        let input = self.prepare(window)?;
        let (output, duration_ms) = timed(|| classifier.run(&input));
        let probabilities = output?.single_row()?;

        let class_index = argmax(&probabilities).ok_or_else(|| {
            NnError::inference(format!(
                "classifier returned no usable probabilities ({} values)",
                probabilities.len()
            ))
        })?;
        let activity = decoder.decode(class_index)?.to_string();
        let confidence = probabilities[class_index].clamp(0.0, 1.0);

        self.stats.lock().record(duration_ms);
        Ok(Prediction {
            activity,
            confidence,
            class_index,
            duration_ms,
        })
    }
}

#[cfg(feature = "onnx")]
fn load_backend(path: &Path, options: &InferenceOptions) -> NnResult<Box<dyn Backend>> {
    let backend = crate::onnx::OnnxBackend::from_file_with_options(path, options.clone())?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "onnx"))]
fn load_backend(path: &Path, _options: &InferenceOptions) -> NnResult<Box<dyn Backend>> {
    Err(NnError::BackendUnavailable(format!(
        "cannot load {}: built without the `onnx` feature",
        path.display()
    )))
}
