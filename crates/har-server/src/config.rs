//! Service configuration.
//!
//! [`HarConfig`] is fixed at startup. It can be read from a JSON file and is
//! then overridden field by field from the command line. Every field has a
//! default, so an empty `{}` file is a valid configuration.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use har_nn::{ArtifactPaths, InferenceOptions, NUM_FEATURES};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Canonical incoming key order: acceleration x/y/z then angular velocity x/y/z.
pub const DEFAULT_FEATURE_KEYS: [&str; NUM_FEATURES] =
    ["accel_x", "accel_y", "accel_z", "gyro_x", "gyro_y", "gyro_z"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarConfig {
    /// Windowing and stream parameters
    pub stream: StreamConfig,
    /// Model artifact locations
    pub artifacts: ArtifactConfig,
    /// Network surface
    pub server: ServerConfig,
}

/// Windowing parameters shared by every sensor stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Nominal client sampling rate. Default: **20 Hz**.
    pub sampling_rate_hz: f64,
    /// Samples per inference window. Default: **60**.
    pub window_size: usize,
    /// New samples required between inferences. Default: **30**.
    pub stride: usize,
    /// Extra strides of history kept per client. Default: **5**.
    pub buffer_strides: usize,
    /// Incoming record keys, in the order the model expects them
    pub feature_keys: Vec<String>,
    /// Upper bound for a single inference call; unset means no timeout
    pub inference_timeout_ms: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 20.0,
            window_size: 60,
            stride: 30,
            buffer_strides: 5,
            feature_keys: DEFAULT_FEATURE_KEYS.iter().map(|k| k.to_string()).collect(),
            inference_timeout_ms: None,
        }
    }
}

impl StreamConfig {
    /// Per-client buffer capacity: `window_size + stride * buffer_strides`
    pub fn buffer_capacity(&self) -> usize {
        self.window_size + self.stride * self.buffer_strides
    }

    /// Number of features per sample
    pub fn num_features(&self) -> usize {
        self.feature_keys.len()
    }
}

/// Model artifacts and label presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Artifact locations
    #[serde(flatten)]
    pub paths: ArtifactPaths,
    /// Backend options
    pub inference: InferenceOptions,
    /// Human-readable names for class labels, used in logs
    pub activity_names: BTreeMap<String, String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        let activity_names = [
            ("A", "Walking"),
            ("B", "Jogging"),
            ("C", "Using Stairs"),
            ("D", "Sitting"),
            ("E", "Standing"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            paths: ArtifactPaths::default(),
            inference: InferenceOptions::default(),
            activity_names,
        }
    }
}

impl ArtifactConfig {
    /// Display name for a label, falling back to the label itself
    pub fn display_name<'a>(&'a self, label: &'a str) -> &'a str {
        self.activity_names
            .get(label)
            .map(String::as_str)
            .unwrap_or(label)
    }
}

/// HTTP/websocket surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. Default: **0.0.0.0:8080**.
    pub bind: SocketAddr,
    /// Directory holding the dashboard page, served at `/`.
    /// Default: **static**, relative to the working directory. `null`
    /// disables static serving.
    pub static_dir: Option<PathBuf>,
    /// Capacity of the observer broadcast channel
    pub broadcast_capacity: usize,
    /// Answer malformed records with an `error` event
    pub emit_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: Some(PathBuf::from("static")),
            broadcast_capacity: 1024,
            emit_errors: false,
        }
    }
}

impl HarConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: HarConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::invalid_value("(file)", e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every invariant the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.stream;
        if !(s.sampling_rate_hz.is_finite() && s.sampling_rate_hz > 0.0) {
            return Err(ConfigError::invalid_value("stream.sampling_rate_hz", "must be > 0"));
        }
        if s.window_size == 0 {
            return Err(ConfigError::invalid_value("stream.window_size", "must be > 0"));
        }
        if s.stride == 0 {
            return Err(ConfigError::invalid_value("stream.stride", "must be > 0"));
        }
        if s.buffer_strides == 0 {
            return Err(ConfigError::invalid_value("stream.buffer_strides", "must be >= 1"));
        }
        if s.feature_keys.len() != NUM_FEATURES {
            return Err(ConfigError::invalid_value(
                "stream.feature_keys",
                format!("expected {} keys, got {}", NUM_FEATURES, s.feature_keys.len()),
            ));
        }
        for (i, key) in s.feature_keys.iter().enumerate() {
            if s.feature_keys[..i].contains(key) {
                return Err(ConfigError::invalid_value(
                    "stream.feature_keys",
                    format!("duplicate key '{}'", key),
                ));
            }
        }
        if s.inference_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "stream.inference_timeout_ms",
                "must be > 0 when set",
            ));
        }
        if self.server.broadcast_capacity == 0 {
            return Err(ConfigError::invalid_value("server.broadcast_capacity", "must be > 0"));
        }
        Ok(())
    }
}
