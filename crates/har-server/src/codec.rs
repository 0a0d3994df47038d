//! Feature codec: raw inbound records to canonical sensor samples.

use har_nn::NUM_FEATURES;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StreamError, StreamResult};

/// Optional record key carrying the client timestamp in milliseconds
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One inertial sample in canonical feature order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample {
    values: [f32; NUM_FEATURES],
    timestamp_ms: f64,
}

impl SensorSample {
    /// Build a sample from values already in canonical order
    pub fn new(values: [f32; NUM_FEATURES], timestamp_ms: f64) -> Self {
        Self {
            values,
            timestamp_ms,
        }
    }

    /// Feature values in canonical order
    pub fn values(&self) -> &[f32; NUM_FEATURES] {
        &self.values
    }

    /// Client-supplied or arrival timestamp
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }
}

/// Validates inbound records against the canonical key list
#[derive(Debug, Clone)]
pub struct FeatureCodec {
    keys: Vec<String>,
}

impl FeatureCodec {
    /// Create a codec for the given canonical key order
    pub fn new(keys: Vec<String>) -> Self {
        debug_assert_eq!(keys.len(), NUM_FEATURES);
        Self { keys }
    }

    /// Canonical key order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Decode a JSON value, which must be an object
    pub fn decode_value(&self, record: &Value) -> StreamResult<SensorSample> {
        match record {
            Value::Object(map) => self.decode(map),
            other => Err(StreamError::InvalidField {
                key: "(record)".to_string(),
                reason: format!("expected an object, got {}", json_kind(other)),
            }),
        }
    }

    /// Decode a record, reordering its values into canonical order.
    ///
    /// Every absent key is reported at once. Missing axes are never
    /// defaulted. Without a usable `timestamp` the current time is assigned.
    pub fn decode(&self, record: &Map<String, Value>) -> StreamResult<SensorSample> {
        let missing: Vec<String> = self
            .keys
            .iter()
            .filter(|k| !record.contains_key(k.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StreamError::MissingField { missing });
        }

        let mut values = [0.0_f32; NUM_FEATURES];
        for (slot, key) in values.iter_mut().zip(&self.keys) {
            *slot = finite_number(key, &record[key.as_str()])? as f32;
        }

        let timestamp_ms = match record.get(TIMESTAMP_KEY) {
            None | Some(Value::Null) => now_ms(),
            Some(v) => finite_number(TIMESTAMP_KEY, v)?,
        };

        Ok(SensorSample::new(values, timestamp_ms))
    }
}

fn finite_number(key: &str, value: &Value) -> StreamResult<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(StreamError::InvalidField {
            key: key.to_string(),
            reason: "not a finite number".to_string(),
        }),
        None => Err(StreamError::InvalidField {
            key: key.to_string(),
            reason: format!("expected a number, got {}", json_kind(value)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Milliseconds since the Unix epoch
pub fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FEATURE_KEYS;
    use serde_json::json;

    fn codec() -> FeatureCodec {
        FeatureCodec::new(DEFAULT_FEATURE_KEYS.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn test_decode_reorders_into_canonical_order() {
        let record = json!({
            "gyro_z": 6.0, "accel_x": 1.0, "gyro_x": 4.0,
            "accel_z": 3.0, "gyro_y": 5.0, "accel_y": 2.0,
            "timestamp": 1_700_000_000_000_i64
        });
        let sample = codec().decode_value(&record).unwrap();
        assert_eq!(sample.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(sample.timestamp_ms(), 1_700_000_000_000.0);
    }

    #[test]
    fn test_decode_lists_every_missing_key() {
        let record = json!({"accel_x": 1.0, "accel_z": 3.0, "gyro_x": 4.0});
        match codec().decode_value(&record) {
            Err(StreamError::MissingField { missing }) => {
                assert_eq!(missing, vec!["accel_y", "gyro_y", "gyro_z"]);
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_assigns_timestamp_when_absent() {
        let before = now_ms();
        let record = json!({
            "accel_x": 0, "accel_y": 0, "accel_z": 9.81,
            "gyro_x": 0, "gyro_y": 0, "gyro_z": 0
        });
        let sample = codec().decode_value(&record).unwrap();
        assert!(sample.timestamp_ms() >= before);
    }

    #[test]
    fn test_decode_rejects_non_numeric_axis() {
        let record = json!({
            "accel_x": "fast", "accel_y": 0, "accel_z": 0,
            "gyro_x": 0, "gyro_y": 0, "gyro_z": 0
        });
        let err = codec().decode_value(&record).unwrap_err();
        assert!(matches!(err, StreamError::InvalidField { ref key, .. } if key == "accel_x"));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(codec().decode_value(&json!([1, 2, 3])).is_err());
    }
}
