//! Per-stream state and the stride-based inference trigger.
//!
//! A stream is *Accumulating* until its buffer holds at least one window and
//! at least `stride` samples arrived since the last trigger; it is then
//! *Ready*. Triggering extracts the latest window and resets the counter to
//! zero before inference runs, so a failing window is only retried after
//! another `stride` samples.

use ndarray::Array2;
use serde::Serialize;

use crate::buffer::WindowBuffer;
use crate::codec::SensorSample;
use crate::error::StreamResult;

/// Trigger phase of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Not enough new data yet
    Accumulating,
    /// An inference is due
    Ready,
}

/// Window length and stride
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowingPolicy {
    window_size: usize,
    stride: usize,
}

impl WindowingPolicy {
    /// Create a policy. Both values must be positive.
    pub fn new(window_size: usize, stride: usize) -> Self {
        debug_assert!(window_size > 0 && stride > 0);
        Self {
            window_size,
            stride,
        }
    }

    /// Samples per window
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Samples between triggers
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Phase implied by the buffer length and the stride counter
    pub fn phase(&self, buffered: usize, since_last: usize) -> StreamPhase {
        if buffered >= self.window_size && since_last >= self.stride {
            StreamPhase::Ready
        } else {
            StreamPhase::Accumulating
        }
    }
}

/// Most recent successful classification for a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestPrediction {
    /// Decoded class label
    pub activity: String,
    /// Probability of the selected class
    pub confidence: f32,
    /// Timestamp of the sample that triggered the window
    pub timestamp_ms: f64,
}

/// A window extracted on trigger, ready for the numeric pipeline
#[derive(Debug, Clone)]
pub struct PendingWindow {
    /// `(window_size, features)` matrix, oldest row first
    pub matrix: Array2<f32>,
    /// Timestamp of the triggering sample
    pub trigger_timestamp_ms: f64,
}

/// Buffer, stride counter and latest prediction of one sensor stream
#[derive(Debug, Clone)]
pub struct StreamState {
    buffer: WindowBuffer,
    samples_since_last_prediction: usize,
    latest_prediction: Option<LatestPrediction>,
}

impl StreamState {
    /// Fresh state with a buffer of the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: WindowBuffer::with_capacity(capacity),
            samples_since_last_prediction: 0,
            latest_prediction: None,
        }
    }

    /// Append a sample and, when the policy says so, extract a window.
    ///
    /// On trigger the stride counter is reset before the window is handed
    /// out, whatever happens to it afterwards.
    pub fn push(
        &mut self,
        sample: SensorSample,
        policy: &WindowingPolicy,
    ) -> Option<StreamResult<PendingWindow>> {
        self.buffer.append(sample);
        self.samples_since_last_prediction += 1;

        match self.phase(policy) {
            StreamPhase::Accumulating => None,
            StreamPhase::Ready => {
                self.samples_since_last_prediction = 0;
                Some(
                    self.buffer
                        .latest_matrix(policy.window_size())
                        .map(|matrix| PendingWindow {
                            matrix,
                            trigger_timestamp_ms: sample.timestamp_ms(),
                        }),
                )
            }
        }
    }

    /// Current phase under `policy`
    pub fn phase(&self, policy: &WindowingPolicy) -> StreamPhase {
        policy.phase(self.buffer.len(), self.samples_since_last_prediction)
    }

    /// Store a successful classification
    pub fn record_prediction(&mut self, prediction: LatestPrediction) {
        self.latest_prediction = Some(prediction);
    }

    /// Latest successful classification, if any
    pub fn latest_prediction(&self) -> Option<&LatestPrediction> {
        self.latest_prediction.as_ref()
    }

    /// Samples appended since the last trigger
    pub fn samples_since_last_prediction(&self) -> usize {
        self.samples_since_last_prediction
    }

    /// The underlying buffer
    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }
}
