//! ONNX Runtime backend for the sequence classifier.
//!
//! The exported model takes one `(1, window, features)` f32 input and
//! produces `(1, classes)` probabilities.

use crate::error::{NnError, NnResult};
use crate::inference::{Backend, InferenceOptions};
use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tracing::info;

/// ONNX Runtime session wrapper
pub struct OnnxSession {
    session: Session,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OnnxSession {
    /// Create a new ONNX session from a file
    pub fn from_file<P: AsRef<Path>>(path: P, options: &InferenceOptions) -> NnResult<Self> {
        let path = path.as_ref();
        info!(?path, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| NnError::model_load("model", format!("session builder: {}", e)))?
            .with_intra_threads(options.num_threads.max(1))
            .map_err(|e| NnError::model_load("model", format!("thread config: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| NnError::model_load("model", format!("{}: {}", path.display(), e)))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| NnError::model_load("model", "model declares no inputs"))?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| NnError::model_load("model", "model declares no outputs"))?;

        info!(input = %input_name, output = %output_name, "ONNX model loaded successfully");

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }

    /// Run inference on one batched window
    pub fn run(&mut self, input: &Tensor) -> NnResult<Tensor> {
        let arr = input.as_array3()?;
        let shape: Vec<i64> = arr.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = arr.iter().copied().collect();

        let ort_tensor = ort::value::Tensor::from_array((shape, data))
            .map_err(|e| NnError::inference(format!("Failed to create ORT tensor: {}", e)))?;
        let session_inputs = ort::inputs![self.input_name.as_str() => ort_tensor];

        let outputs = self
            .session
            .run(session_inputs)
            .map_err(|e| NnError::inference(format!("Session run failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| NnError::inference(format!("missing output '{}'", self.output_name)))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| NnError::inference(format!("output is not f32: {}", e)))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let array = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|e| NnError::inference(format!("Shape error: {}", e)))?;
        Ok(Tensor::FloatND(array))
    }
}

/// ONNX Runtime backend implementation.
///
/// `Session::run` needs exclusive access, so concurrent callers take turns
/// on the inner lock.
pub struct OnnxBackend {
    session: Mutex<OnnxSession>,
    options: InferenceOptions,
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("options", &self.options)
            .finish()
    }
}

impl OnnxBackend {
    /// Create backend from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> NnResult<Self> {
        Self::from_file_with_options(path, InferenceOptions::default())
    }

    /// Create backend from file with options
    pub fn from_file_with_options<P: AsRef<Path>>(
        path: P,
        options: InferenceOptions,
    ) -> NnResult<Self> {
        let session = OnnxSession::from_file(path, &options)?;
        Ok(Self {
            session: Mutex::new(session),
            options,
        })
    }

    /// Get options
    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }
}

impl Backend for OnnxBackend {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn run(&self, input: &Tensor) -> NnResult<Tensor> {
        self.session.lock().run(input)
    }
}
