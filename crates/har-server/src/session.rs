//! Session store keyed by connection id.
//!
//! Every connection starts `Unclassified` and becomes either a sensor stream
//! (first `sensor_data`) or an observer (first dashboard request). The kind
//! never changes afterwards. Disconnecting removes the entry and with it the
//! stream's buffer, stride counter and latest prediction.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::{LatestPrediction, StreamState};

/// Identifier of one websocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Last six hex digits, for compact log lines
    pub fn short(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[simple.len() - 6..].to_string()
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a sensor stream's state; the mutex serializes its mutations
pub type SharedStream = Arc<Mutex<StreamState>>;

/// What a connection is, once known
#[derive(Debug, Clone)]
pub enum Session {
    /// Connected but has not sent a qualifying event yet
    Unclassified,
    /// Supplies sensor samples
    SensorStream(SharedStream),
    /// Watches the dashboard
    Observer,
}

/// Kind of a session without its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// Not yet classified
    Unclassified,
    /// Sensor stream
    SensorStream,
    /// Observer
    Observer,
}

impl ClientKind {
    /// Only observers are sent dashboard broadcasts
    pub fn receives_broadcasts(self) -> bool {
        matches!(self, ClientKind::Observer)
    }
}

impl Session {
    /// Kind of this session
    pub fn kind(&self) -> ClientKind {
        match self {
            Session::Unclassified => ClientKind::Unclassified,
            Session::SensorStream(_) => ClientKind::SensorStream,
            Session::Observer => ClientKind::Observer,
        }
    }
}

/// Result of asking for a connection's sensor stream
#[derive(Debug, Clone)]
pub enum StreamRegistration {
    /// The stream already existed
    Existing(SharedStream),
    /// The stream was created by this call
    Created(SharedStream),
    /// The connection is an observer and cannot stream
    Rejected,
}

/// Latest prediction of one stream, `{}` when there is none yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSnapshot {
    /// The prediction, flattened into the entry
    #[serde(flatten)]
    pub prediction: Option<LatestPrediction>,
}

/// All live connections and their state
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection as unclassified. Returns false if it was
    /// already known.
    pub fn connect(&self, id: ConnectionId) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id, Session::Unclassified);
        true
    }

    /// Remove a connection and everything held for it
    pub fn disconnect(&self, id: ConnectionId) -> Option<ClientKind> {
        self.sessions.write().remove(&id).map(|s| s.kind())
    }

    /// Fetch the connection's stream, creating it on first use
    pub fn register_sensor_stream(&self, id: ConnectionId, capacity: usize) -> StreamRegistration {
        if let Some(Session::SensorStream(stream)) = self.sessions.read().get(&id) {
            return StreamRegistration::Existing(stream.clone());
        }

        let mut sessions = self.sessions.write();
        let entry = sessions.entry(id).or_insert(Session::Unclassified);
        match entry {
            Session::SensorStream(stream) => StreamRegistration::Existing(stream.clone()),
            Session::Observer => StreamRegistration::Rejected,
            Session::Unclassified => {
                let stream = Arc::new(Mutex::new(StreamState::new(capacity)));
                *entry = Session::SensorStream(stream.clone());
                StreamRegistration::Created(stream)
            }
        }
    }

    /// Classify the connection as an observer if it is still unclassified.
    /// Returns the resulting kind.
    pub fn mark_observer(&self, id: ConnectionId) -> ClientKind {
        let mut sessions = self.sessions.write();
        let entry = sessions.entry(id).or_insert(Session::Unclassified);
        if let Session::Unclassified = entry {
            *entry = Session::Observer;
        }
        entry.kind()
    }

    /// Kind of a known connection
    pub fn kind(&self, id: ConnectionId) -> Option<ClientKind> {
        self.sessions.read().get(&id).map(Session::kind)
    }

    /// True when dashboard broadcasts should be delivered to the connection.
    /// Unknown connections receive nothing.
    pub fn receives_broadcasts(&self, id: ConnectionId) -> bool {
        self.kind(id).map_or(false, ClientKind::receives_broadcasts)
    }

    /// The connection's stream, if it is a sensor stream
    pub fn sensor_stream(&self, id: ConnectionId) -> Option<SharedStream> {
        match self.sessions.read().get(&id) {
            Some(Session::SensorStream(stream)) => Some(stream.clone()),
            _ => None,
        }
    }

    /// Number of active sensor streams
    pub fn sensor_count(&self) -> usize {
        self.count(ClientKind::SensorStream)
    }

    /// Number of observers
    pub fn observer_count(&self) -> usize {
        self.count(ClientKind::Observer)
    }

    fn count(&self, kind: ClientKind) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|s| s.kind() == kind)
            .count()
    }

    /// Latest prediction of every active sensor stream
    pub fn latest_predictions(&self) -> BTreeMap<ConnectionId, PredictionSnapshot> {
        let streams: Vec<(ConnectionId, SharedStream)> = self
            .sessions
            .read()
            .iter()
            .filter_map(|(id, s)| match s {
                Session::SensorStream(stream) => Some((*id, stream.clone())),
                _ => None,
            })
            .collect();

        streams
            .into_iter()
            .map(|(id, stream)| {
                let prediction = stream.lock().latest_prediction().cloned();
                (id, PredictionSnapshot { prediction })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_short_suffix() {
        let uuid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let id = ConnectionId::from_uuid(uuid);
        assert_eq!(id.short(), "5fe0c8");
    }

    #[test]
    fn test_sensor_stream_created_once() {
        let registry = SessionRegistry::new();
        let id = ConnectionId::new();
        registry.connect(id);
        assert_eq!(registry.kind(id), Some(ClientKind::Unclassified));

        assert!(matches!(
            registry.register_sensor_stream(id, 10),
            StreamRegistration::Created(_)
        ));
        assert!(matches!(
            registry.register_sensor_stream(id, 10),
            StreamRegistration::Existing(_)
        ));
        assert_eq!(registry.sensor_count(), 1);
        assert_eq!(registry.sensor_stream(id).unwrap().lock().buffer().capacity(), 10);
    }

    #[test]
    fn test_kind_is_fixed_after_first_classification() {
        let registry = SessionRegistry::new();
        let observer = ConnectionId::new();
        registry.connect(observer);
        assert_eq!(registry.mark_observer(observer), ClientKind::Observer);
        assert!(matches!(
            registry.register_sensor_stream(observer, 10),
            StreamRegistration::Rejected
        ));

        let sensor = ConnectionId::new();
        registry.register_sensor_stream(sensor, 10);
        assert_eq!(registry.mark_observer(sensor), ClientKind::SensorStream);
        assert!(!registry.receives_broadcasts(sensor));
        assert_eq!(registry.observer_count(), 1);
    }

    #[test]
    fn test_only_observers_receive_broadcasts() {
        let registry = SessionRegistry::new();
        let (fresh, sensor, observer) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        registry.connect(fresh);
        registry.connect(sensor);
        registry.connect(observer);
        registry.register_sensor_stream(sensor, 10);
        registry.mark_observer(observer);

        assert!(!registry.receives_broadcasts(fresh));
        assert!(!registry.receives_broadcasts(sensor));
        assert!(registry.receives_broadcasts(observer));
        assert!(!registry.receives_broadcasts(ConnectionId::new()));

        registry.disconnect(observer);
        assert!(!registry.receives_broadcasts(observer));
    }

    #[test]
    fn test_disconnect_purges_stream() {
        let registry = SessionRegistry::new();
        let id = ConnectionId::new();
        registry.connect(id);
        registry.register_sensor_stream(id, 10);
        assert_eq!(registry.disconnect(id), Some(ClientKind::SensorStream));
        assert!(registry.sensor_stream(id).is_none());
        assert!(registry.latest_predictions().is_empty());
        assert_eq!(registry.disconnect(id), None);
    }

    #[test]
    fn test_prediction_snapshot_serialization() {
        let empty = PredictionSnapshot { prediction: None };
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");

        let full = PredictionSnapshot {
            prediction: Some(LatestPrediction {
                activity: "B".into(),
                confidence: 0.5,
                timestamp_ms: 10.0,
            }),
        };
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["activity"], "B");
        assert_eq!(json["timestamp_ms"], 10.0);
    }
}
