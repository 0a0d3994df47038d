//! Event dispatcher.
//!
//! [`HarService`] owns the session registry and the shared model bundle and
//! turns inbound events into replies and observer broadcasts. Samples of one
//! connection are handled in arrival order; different connections proceed
//! independently and only share the read-only bundle.

use std::sync::Arc;
use std::time::Duration;

use har_nn::{ModelBundle, Prediction};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::codec::FeatureCodec;
use crate::config::HarConfig;
use crate::dto::{
    ClientEvent, DashboardConfig, DashboardUpdate, ErrorPayload, HealthResponse,
    PredictionPayload, ServerEvent,
};
use crate::error::{StreamError, StreamResult};
use crate::policy::{LatestPrediction, PendingWindow, WindowingPolicy};
use crate::session::{ConnectionId, SessionRegistry, StreamRegistration};

/// Shared service state, cheap to clone
#[derive(Clone)]
pub struct HarService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: HarConfig,
    codec: FeatureCodec,
    policy: WindowingPolicy,
    bundle: Arc<ModelBundle>,
    registry: SessionRegistry,
    events_tx: broadcast::Sender<ServerEvent>,
}

impl HarService {
    /// Build the service from a validated configuration and a loaded bundle
    pub fn new(config: HarConfig, bundle: ModelBundle) -> Self {
        let (events_tx, _) = broadcast::channel(config.server.broadcast_capacity);
        let codec = FeatureCodec::new(config.stream.feature_keys.clone());
        let policy = WindowingPolicy::new(config.stream.window_size, config.stream.stride);
        Self {
            inner: Arc::new(ServiceInner {
                config,
                codec,
                policy,
                bundle: Arc::new(bundle),
                registry: SessionRegistry::new(),
                events_tx,
            }),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &HarConfig {
        &self.inner.config
    }

    /// Shared model bundle
    pub fn bundle(&self) -> &ModelBundle {
        &self.inner.bundle
    }

    /// Session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Subscribe to observer broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.events_tx.subscribe()
    }

    /// True when the connection should receive broadcasts
    pub fn receives_broadcasts(&self, id: ConnectionId) -> bool {
        self.inner.registry.receives_broadcasts(id)
    }

    /// Register a new connection
    pub fn on_connect(&self, id: ConnectionId) {
        self.inner.registry.connect(id);
        info!(client = %id.short(), "Client connected");
        self.broadcast_dashboard();
    }

    /// Purge a connection and everything held for it
    pub fn on_disconnect(&self, id: ConnectionId) {
        match self.inner.registry.disconnect(id) {
            Some(kind) => info!(client = %id.short(), kind = ?kind, "Client disconnected"),
            None => debug!(client = %id.short(), "Disconnect for unknown client"),
        }
        self.broadcast_dashboard();
    }

    /// Classify the connection as an observer and return the snapshot
    pub fn on_dashboard_request(&self, id: ConnectionId) -> DashboardUpdate {
        let kind = self.inner.registry.mark_observer(id);
        debug!(client = %id.short(), kind = ?kind, "Dashboard state requested");
        self.snapshot()
    }

    /// Handle one client event, returning the direct reply if any
    pub async fn dispatch(&self, id: ConnectionId, event: ClientEvent) -> Option<ServerEvent> {
        match event {
            ClientEvent::SensorData(record) => match self.on_sensor_data(id, &record).await {
                Ok(Some(prediction)) => Some(ServerEvent::Prediction(PredictionPayload::from(
                    &prediction,
                ))),
                Ok(None) => None,
                Err(e) if e.is_malformed_record() && self.inner.config.server.emit_errors => {
                    Some(ServerEvent::Error(ErrorPayload::from(&e)))
                }
                Err(_) => None,
            },
            ClientEvent::GetInitialDashboardState => {
                Some(ServerEvent::DashboardUpdate(self.on_dashboard_request(id)))
            }
        }
    }

    /// Ingest one sensor record.
    ///
    /// Returns the prediction when this sample triggered a successful
    /// inference. Without every prediction component loaded the record is
    /// ignored and no stream state is created.
    pub async fn on_sensor_data(
        &self,
        id: ConnectionId,
        record: &Value,
    ) -> StreamResult<Option<Prediction>> {
        let inner = &self.inner;
        if !inner.bundle.is_ready() {
            debug!(client = %id.short(), "Prediction components not ready, ignoring sample");
            return Err(StreamError::NotReady);
        }

        let sample = inner.codec.decode_value(record).map_err(|e| {
            warn!(client = %id.short(), code = e.code(), "Dropped sensor record: {}", e);
            e
        })?;

        let stream = match inner
            .registry
            .register_sensor_stream(id, inner.config.stream.buffer_capacity())
        {
            StreamRegistration::Existing(stream) => stream,
            StreamRegistration::Created(stream) => {
                info!(client = %id.short(), "Sensor stream started");
                self.broadcast_dashboard();
                stream
            }
            StreamRegistration::Rejected => {
                warn!(client = %id.short(), "Observer sent sensor data, ignoring");
                return Ok(None);
            }
        };

        let pending = stream.lock().push(sample, &inner.policy);
        let window = match pending {
            None => return Ok(None),
            Some(Ok(window)) => window,
            Some(Err(e)) => {
                warn!(client = %id.short(), "Window extraction failed: {}", e);
                self.broadcast_dashboard();
                return Err(e);
            }
        };

        let trigger_timestamp_ms = window.trigger_timestamp_ms;
        let result = self.classify_window(window).await;
        match &result {
            Ok(prediction) => {
                stream.lock().record_prediction(LatestPrediction {
                    activity: prediction.activity.clone(),
                    confidence: prediction.confidence,
                    timestamp_ms: trigger_timestamp_ms,
                });
                info!(
                    "Prediction for client {}: {} ({:.1}%) in {:.1} ms",
                    id.short(),
                    inner.config.artifacts.display_name(&prediction.activity),
                    prediction.confidence * 100.0,
                    prediction.duration_ms
                );
            }
            Err(e) => {
                warn!(client = %id.short(), code = e.code(), "Inference failed: {}", e);
            }
        }
        self.broadcast_dashboard();
        result.map(Some)
    }

    async fn classify_window(&self, window: PendingWindow) -> StreamResult<Prediction> {
        let bundle = Arc::clone(&self.inner.bundle);
        let task = tokio::task::spawn_blocking(move || bundle.classify(window.matrix.view()));

        let joined = match self.inner.config.stream.inference_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), task)
                .await
                .map_err(|_| StreamError::Inference(format!("timed out after {} ms", ms)))?,
            None => task.await,
        };
        let prediction =
            joined.map_err(|e| StreamError::Inference(format!("inference task failed: {}", e)))??;
        Ok(prediction)
    }

    /// Current dashboard snapshot
    pub fn snapshot(&self) -> DashboardUpdate {
        let inner = &self.inner;
        let stream = &inner.config.stream;
        DashboardUpdate {
            status: inner.bundle.status(),
            config: DashboardConfig {
                window_size: stream.window_size,
                stride: stream.stride,
                sampling_rate: stream.sampling_rate_hz,
                num_features: stream.num_features(),
                classes: inner.bundle.classes(),
            },
            client_count: inner.registry.sensor_count(),
            latest_predictions: inner.registry.latest_predictions(),
        }
    }

    /// Liveness summary
    pub fn health(&self) -> HealthResponse {
        let components = self.inner.bundle.status();
        HealthResponse {
            status: if components.is_ready() { "ok" } else { "degraded" },
            sensor_clients: self.inner.registry.sensor_count(),
            observers: self.inner.registry.observer_count(),
            components,
            inference: self.inner.bundle.stats(),
        }
    }

    fn broadcast_dashboard(&self) {
        if self.inner.events_tx.receiver_count() == 0 {
            return;
        }
        let update = ServerEvent::DashboardUpdate(self.snapshot());
        if self.inner.events_tx.send(update).is_err() {
            debug!("No observers listening for dashboard update");
        }
    }
}
