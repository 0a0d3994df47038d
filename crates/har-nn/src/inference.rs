//! Classifier backend abstraction.
//!
//! A backend takes one batched window tensor and returns the class
//! probabilities. Backends are shared read-only across every client stream,
//! so implementations must be `Send + Sync` and safe to call concurrently.

use crate::error::{NnError, NnResult};
use crate::tensor::{Tensor, TensorShape};
use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Options for inference execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOptions {
    /// Number of intra-op CPU threads
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Run a dummy window through the model after loading
    #[serde(default)]
    pub warmup: bool,
}

fn default_num_threads() -> usize {
    1
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
            warmup: false,
        }
    }
}

/// Backend trait for different inference engines
pub trait Backend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Run the classifier on a `(1, window, features)` tensor
    fn run(&self, input: &Tensor) -> NnResult<Tensor>;

    /// Warm up the model (optional pre-run for optimization)
    fn warmup(&self, window_size: usize, num_features: usize) -> NnResult<()> {
        let dummy = Tensor::from_array3(ndarray::Array3::zeros((1, window_size, num_features)));
        self.run(&dummy).map(|_| ())
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, input: &Tensor) -> NnResult<Tensor> {
        (**self).run(input)
    }

    fn warmup(&self, window_size: usize, num_features: usize) -> NnResult<()> {
        (**self).warmup(window_size, num_features)
    }
}

/// Scripted backend for tests and dry runs.
///
/// Each call pops the next scripted response; once the script is exhausted
/// the fallback response is returned forever.
pub struct MockBackend {
    name: String,
    script: Mutex<VecDeque<NnResult<Vec<f32>>>>,
    fallback: Vec<f32>,
    calls: Mutex<Vec<TensorShape>>,
}

impl MockBackend {
    /// Create a backend that always returns `probabilities`
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: probabilities,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn then_return(self, probabilities: Vec<f32>) -> Self {
        self.script.lock().push_back(Ok(probabilities));
        self
    }

    /// Queue a failure
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .push_back(Err(NnError::inference(message.into())));
        self
    }

    /// Number of times `run` has been invoked
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Input shapes seen so far
    pub fn seen_shapes(&self) -> Vec<TensorShape> {
        self.calls.lock().clone()
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: &Tensor) -> NnResult<Tensor> {
        self.calls.lock().push(input.shape());
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        let probs = next?;
        let n = probs.len();
        let array = Array2::from_shape_vec((1, n), probs)
            .map_err(|e| NnError::inference(format!("mock output: {}", e)))?;
        Ok(Tensor::from_array2(array))
    }
}

/// Statistics for inference performance
#[derive(Debug, Default, Clone, Serialize)]
pub struct InferenceStats {
    /// Total number of successful inferences
    pub total_inferences: u64,
    /// Total number of failed inferences
    pub failed_inferences: u64,
    /// Total inference time in milliseconds
    pub total_time_ms: f64,
    /// Average inference time
    pub avg_time_ms: f64,
    /// Min inference time
    pub min_time_ms: f64,
    /// Max inference time
    pub max_time_ms: f64,
    /// Last inference time
    pub last_time_ms: f64,
}

impl InferenceStats {
    /// Record a successful inference
    pub fn record(&mut self, time_ms: f64) {
        self.total_inferences += 1;
        self.total_time_ms += time_ms;
        self.last_time_ms = time_ms;
        self.avg_time_ms = self.total_time_ms / self.total_inferences as f64;
        if self.total_inferences == 1 {
            self.min_time_ms = time_ms;
            self.max_time_ms = time_ms;
        } else {
            self.min_time_ms = self.min_time_ms.min(time_ms);
            self.max_time_ms = self.max_time_ms.max(time_ms);
        }
    }

    /// Record a failed inference
    pub fn record_failure(&mut self) {
        self.failed_inferences += 1;
    }
}

/// Run `f`, returning its result with elapsed wall time in milliseconds
pub(crate) fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let out = f();
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    debug!(elapsed_ms = elapsed, "Backend call finished");
    (out, elapsed)
}
