//! Pre-fitted feature-wise standardization.
//!
//! The scaler is fitted offline; this module only loads its mean/scale
//! vectors and applies `(value - mean[f]) / scale[f]` column by column.

use crate::error::{NnError, NnResult};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// On-disk representation of a fitted standard scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default)]
    n_features_in: Option<usize>,
}

/// Fitted per-feature mean/scale normalization
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
    n_features_in: usize,
}

impl StandardScaler {
    /// Build a scaler from explicit vectors.
    ///
    /// Fails when the vectors differ in length, are empty, or any scale is
    /// zero or non-finite.
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> NnResult<Self> {
        if mean.is_empty() {
            return Err(NnError::config("scaler has no features"));
        }
        if mean.len() != scale.len() {
            return Err(NnError::config(format!(
                "scaler mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            )));
        }
        if let Some(idx) = scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            return Err(NnError::config(format!(
                "scaler scale[{}] = {} is not usable",
                idx, scale[idx]
            )));
        }
        if let Some(idx) = mean.iter().position(|m| !m.is_finite()) {
            return Err(NnError::config(format!("scaler mean[{}] is not finite", idx)));
        }
        let n_features_in = mean.len();
        Ok(Self {
            mean,
            scale,
            n_features_in,
        })
    }

    /// Load a scaler from a JSON artifact
    pub fn from_json<P: AsRef<Path>>(path: P) -> NnResult<Self> {
        let path = path.as_ref();
        info!(?path, "Loading scaler");
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NnError::model_load("scaler", format!("{}: {}", path.display(), e)))?;
        let file: ScalerFile = serde_json::from_str(&contents)
            .map_err(|e| NnError::model_load("scaler", format!("{}: {}", path.display(), e)))?;

        let declared = file.n_features_in;
        let mean = file.mean.into_iter().map(|v| v as f32).collect();
        let scale = file.scale.into_iter().map(|v| v as f32).collect();
        let scaler = Self::new(mean, scale)
            .map_err(|e| NnError::model_load("scaler", e.to_string()))?;

        if let Some(n) = declared {
            if n != scaler.n_features_in {
                return Err(NnError::model_load(
                    "scaler",
                    format!(
                        "n_features_in is {} but mean/scale have {} entries",
                        n, scaler.n_features_in
                    ),
                ));
            }
        }
        info!(features = scaler.n_features_in, "Scaler loaded");
        Ok(scaler)
    }

    /// Number of features the scaler was fitted on
    pub fn n_features_in(&self) -> usize {
        self.n_features_in
    }

    /// Per-feature means
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Per-feature scales
    pub fn scale(&self) -> &[f32] {
        &self.scale
    }

    /// Standardize a `(rows, features)` matrix column by column
    pub fn transform(&self, input: ArrayView2<'_, f32>) -> NnResult<Array2<f32>> {
        let cols = input.ncols();
        if cols != self.n_features_in {
            return Err(NnError::scaling(format!(
                "input has {} features, scaler was fitted on {}",
                cols, self.n_features_in
            )));
        }
        let mut out = input.to_owned();
        for (f, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.mean[f];
            let scale = self.scale[f];
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(NnError::scaling("scaled window contains non-finite values"));
        }
        Ok(out)
    }
}
