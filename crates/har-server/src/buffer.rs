//! Bounded per-client ring buffer of sensor samples.

use std::collections::VecDeque;

use ndarray::Array2;

use crate::codec::SensorSample;
use crate::error::{StreamError, StreamResult};

/// Fixed-capacity FIFO of the most recent samples for one stream.
///
/// Appending to a full buffer evicts the oldest sample first. Capacity is
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<SensorSample>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create an empty buffer. A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head when full.
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, sample: SensorSample) -> Option<SensorSample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// The most recent `n` samples in arrival order
    pub fn latest(&self, n: usize) -> StreamResult<Vec<SensorSample>> {
        let start = self.start_of_latest(n)?;
        Ok(self.samples.range(start..).copied().collect())
    }

    /// The most recent `n` samples as an `(n, features)` matrix
    pub fn latest_matrix(&self, n: usize) -> StreamResult<Array2<f32>> {
        let start = self.start_of_latest(n)?;
        let features = har_nn::NUM_FEATURES;
        let mut data = Vec::with_capacity(n * features);
        for sample in self.samples.range(start..) {
            data.extend_from_slice(sample.values());
        }
        Array2::from_shape_vec((n, features), data).map_err(|_| StreamError::ShapeMismatch {
            expected: vec![n, features],
            actual: vec![self.samples.len() - start, features],
        })
    }

    fn start_of_latest(&self, n: usize) -> StreamResult<usize> {
        if n > self.samples.len() {
            return Err(StreamError::InsufficientData {
                required: n,
                available: self.samples.len(),
            });
        }
        Ok(self.samples.len() - n)
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &SensorSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(i: usize) -> SensorSample {
        SensorSample::new([i as f32; 6], i as f64)
    }

    #[test]
    fn test_latest_returns_tail_in_order() {
        let mut buf = WindowBuffer::with_capacity(10);
        for i in 0..5 {
            buf.append(sample(i));
        }
        let latest = buf.latest(3).unwrap();
        let ts: Vec<f64> = latest.iter().map(|s| s.timestamp_ms()).collect();
        assert_eq!(ts, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_latest_insufficient_data() {
        let mut buf = WindowBuffer::with_capacity(10);
        buf.append(sample(0));
        match buf.latest(2) {
            Err(StreamError::InsufficientData { required, available }) => {
                assert_eq!((required, available), (2, 1));
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_append_evicts_oldest_when_full() {
        let mut buf = WindowBuffer::with_capacity(3);
        assert!(buf.append(sample(0)).is_none());
        buf.append(sample(1));
        buf.append(sample(2));
        let evicted = buf.append(sample(3)).unwrap();
        assert_eq!(evicted.timestamp_ms(), 0.0);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().next().unwrap().timestamp_ms(), 1.0);
    }

    #[test]
    fn test_latest_matrix_layout() {
        let mut buf = WindowBuffer::with_capacity(4);
        for i in 0..4 {
            buf.append(sample(i));
        }
        let m = buf.latest_matrix(2).unwrap();
        assert_eq!(m.dim(), (2, 6));
        assert_eq!(m[[0, 0]], 2.0);
        assert_eq!(m[[1, 5]], 3.0);
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(capacity in 1usize..64, n in 0usize..300) {
            let mut buf = WindowBuffer::with_capacity(capacity);
            for i in 0..n {
                buf.append(sample(i));
                prop_assert!(buf.len() <= capacity);
            }
            prop_assert_eq!(buf.len(), n.min(capacity));
        }

        #[test]
        fn prop_fifo_eviction_preserves_order(capacity in 1usize..32, n in 0usize..200) {
            let mut buf = WindowBuffer::with_capacity(capacity);
            for i in 0..n {
                let evicted = buf.append(sample(i));
                if i >= capacity {
                    prop_assert_eq!(evicted.map(|s| s.timestamp_ms()), Some((i - capacity) as f64));
                } else {
                    prop_assert!(evicted.is_none());
                }
            }
            let kept: Vec<f64> = buf.iter().map(|s| s.timestamp_ms()).collect();
            let expected: Vec<f64> = (n.saturating_sub(capacity)..n).map(|i| i as f64).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
