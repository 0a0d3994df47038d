//! Wire messages exchanged over the websocket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.

use std::collections::BTreeMap;

use har_nn::{ComponentStatus, InferenceStats, Prediction};
use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::session::{ConnectionId, PredictionSnapshot};

/// Events sent by clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One raw sensor record
    SensorData(serde_json::Value),
    /// Request for the current dashboard snapshot
    GetInitialDashboardState,
}

/// Events sent by the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Classification result, sent to the originating sensor stream
    Prediction(PredictionPayload),
    /// Service snapshot, sent to observers
    DashboardUpdate(DashboardUpdate),
    /// Rejected record, sent only when error replies are enabled
    Error(ErrorPayload),
}

/// Payload of a `prediction` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    /// Decoded class label
    pub activity: String,
    /// Probability of the selected class
    pub confidence: f32,
}

impl From<&Prediction> for PredictionPayload {
    fn from(p: &Prediction) -> Self {
        Self {
            activity: p.activity.clone(),
            confidence: p.confidence,
        }
    }
}

/// Payload of a `dashboard_update` event
#[derive(Debug, Clone, Serialize)]
pub struct DashboardUpdate {
    /// Which prediction components are loaded
    pub status: ComponentStatus,
    /// Windowing configuration and known classes
    pub config: DashboardConfig,
    /// Number of active sensor streams
    pub client_count: usize,
    /// Latest prediction per sensor stream, `{}` when none yet
    pub latest_predictions: BTreeMap<ConnectionId, PredictionSnapshot>,
}

/// Configuration echoed to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConfig {
    /// Samples per window
    pub window_size: usize,
    /// Samples between inferences
    pub stride: usize,
    /// Nominal sampling rate in Hz
    pub sampling_rate: f64,
    /// Features per sample
    pub num_features: usize,
    /// Known class labels, empty when the label encoder is missing
    pub classes: Vec<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` when every component is loaded, `degraded` otherwise
    pub status: &'static str,
    /// Active sensor streams
    pub sensor_clients: usize,
    /// Connected observers
    pub observers: usize,
    /// Component readiness
    pub components: ComponentStatus,
    /// Inference timing counters
    pub inference: InferenceStats,
}

/// Payload of an `error` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl From<&StreamError> for ErrorPayload {
    fn from(err: &StreamError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sensor_data_event() {
        let raw = json!({"event": "sensor_data", "data": {"accel_x": 1.0}});
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::SensorData(record) => assert_eq!(record["accel_x"], 1.0),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_dashboard_request_without_data() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event": "get_initial_dashboard_state"}"#).unwrap();
        assert!(matches!(event, ClientEvent::GetInitialDashboardState));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event": "reboot"}"#).is_err());
    }

    #[test]
    fn test_prediction_wire_format() {
        let event = ServerEvent::Prediction(PredictionPayload {
            activity: "A".into(),
            confidence: 0.5,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"event": "prediction", "data": {"activity": "A", "confidence": 0.5}}));
    }

    #[test]
    fn test_error_payload_from_stream_error() {
        let err = StreamError::MissingField {
            missing: vec!["gyro_z".into()],
        };
        let payload = ErrorPayload::from(&err);
        assert_eq!(payload.code, "MISSING_FIELD");
        assert_eq!(payload.message, "Missing sensor fields: gyro_z");
    }
}
