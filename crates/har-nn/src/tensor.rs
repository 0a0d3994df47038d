//! Tensor types passed between the transform pipeline and classifier backends.

use crate::error::{NnError, NnResult};
use ndarray::{Array2, Array3, ArrayD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a tensor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape(Vec<usize>);

impl TensorShape {
    /// Create a new tensor shape
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get the dimensions
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Get the total number of elements
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for TensorShape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

/// A dense f32 tensor.
///
/// Windows travel as `Float3D` with layout `(batch, time, feature)`;
/// classifier outputs come back as `Float2D` with layout `(batch, class)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// 2D tensor, e.g. a probability vector per batch row
    Float2D(Array2<f32>),
    /// 3D tensor, e.g. a batched window
    Float3D(Array3<f32>),
    /// Arbitrary-rank tensor
    FloatND(ArrayD<f32>),
}

impl Tensor {
    /// Wrap a 3D array
    pub fn from_array3(array: Array3<f32>) -> Self {
        Tensor::Float3D(array)
    }

    /// Wrap a 2D array
    pub fn from_array2(array: Array2<f32>) -> Self {
        Tensor::Float2D(array)
    }

    /// Get the shape of the tensor
    pub fn shape(&self) -> TensorShape {
        match self {
            Tensor::Float2D(a) => TensorShape::from(a.shape()),
            Tensor::Float3D(a) => TensorShape::from(a.shape()),
            Tensor::FloatND(a) => TensorShape::from(a.shape()),
        }
    }

    /// Get the number of elements
    pub fn numel(&self) -> usize {
        self.shape().numel()
    }

    /// Borrow the 3D array, failing for any other layout
    pub fn as_array3(&self) -> NnResult<&Array3<f32>> {
        match self {
            Tensor::Float3D(a) => Ok(a),
            other => Err(NnError::inference(format!(
                "expected a 3D tensor, got shape {}",
                other.shape()
            ))),
        }
    }

    /// Copy all elements out in logical (row-major) order
    pub fn to_vec(&self) -> Vec<f32> {
        match self {
            Tensor::Float2D(a) => a.iter().copied().collect(),
            Tensor::Float3D(a) => a.iter().copied().collect(),
            Tensor::FloatND(a) => a.iter().copied().collect(),
        }
    }

    /// Extract the single row of probabilities from a batch-of-one output.
    ///
    /// Accepts `(n,)`, `(1, n)` and `(1, 1, n)`-style layouts.
    pub fn single_row(&self) -> NnResult<Vec<f32>> {
        let shape = self.shape();
        let dims = shape.dims();
        let leading: usize = dims.iter().take(dims.len().saturating_sub(1)).product();
        if dims.is_empty() || leading != 1 {
            return Err(NnError::inference(format!(
                "expected a single-batch output, got shape {}",
                shape
            )));
        }
        Ok(self.to_vec())
    }
}

/// Index of the largest value; ties resolve to the lowest index.
///
/// Returns `None` for an empty slice or when any value is NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}
