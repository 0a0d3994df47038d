//! WebSocket endpoint for sensor streams and dashboard observers.
//!
//! ## Protocol
//!
//! Clients connect to `/ws` and exchange JSON frames of the form
//! `{"event": ..., "data": ...}`.
//!
//! Client events:
//! - `sensor_data` - one raw IMU record; the first one makes the connection
//!   a sensor stream
//! - `get_initial_dashboard_state` - makes the connection an observer and
//!   returns the current snapshot
//!
//! Server events:
//! - `prediction` - sent to the sensor stream whose window was classified
//! - `dashboard_update` - broadcast to every observer after connection
//!   changes and trigger cycles
//! - `error` - malformed record, only when `server.emit_errors` is set

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::dto::{ClientEvent, ErrorPayload, ServerEvent};
use crate::service::HarService;
use crate::session::ConnectionId;

/// Upgrade handler for `GET /ws`
#[tracing::instrument(skip(service, ws))]
pub async fn ws_handler(State(service): State<HarService>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: HarService) {
    let id = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();

    // Direct replies share the socket sink with broadcasts
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut broadcast_rx = service.subscribe();
    service.on_connect(id);

    let forward_service = service.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
                result = broadcast_rx.recv() => match route_broadcast(&forward_service, id, result) {
                    Delivery::Send(event) => event,
                    Delivery::Skip => continue,
                    Delivery::Stop => break,
                },
            };

            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize outbound event"),
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                if let Err(e) = handle_client_message(&text, id, &service, &reply_tx).await {
                    tracing::warn!(client = %id.short(), error = %e, "Failed to handle WebSocket message");
                }
            }
            Message::Binary(_) => {
                tracing::debug!("Ignoring binary WebSocket message");
            }
            Message::Ping(data) => {
                tracing::trace!(len = data.len(), "Received ping");
            }
            Message::Pong(_) => {
                tracing::trace!("Received pong");
            }
            Message::Close(_) => {
                tracing::debug!(client = %id.short(), "Client closed WebSocket connection");
                break;
            }
        }
    }

    service.on_disconnect(id);
    forward_task.abort();
}

/// What the forward task does with one broadcast receive
#[derive(Debug)]
enum Delivery {
    Send(ServerEvent),
    Skip,
    Stop,
}

/// Filter a broadcast for one connection. Only observers get dashboard
/// updates, and only observers are told when updates were dropped.
fn route_broadcast(
    service: &HarService,
    id: ConnectionId,
    result: Result<ServerEvent, broadcast::error::RecvError>,
) -> Delivery {
    match result {
        Ok(event) if service.receives_broadcasts(id) => Delivery::Send(event),
        Ok(_) => Delivery::Skip,
        Err(broadcast::error::RecvError::Lagged(n)) => {
            if !service.receives_broadcasts(id) {
                return Delivery::Skip;
            }
            tracing::warn!(client = %id.short(), lagged = n, "Observer lagged, dashboard updates dropped");
            Delivery::Send(ServerEvent::Error(ErrorPayload {
                code: "MESSAGES_DROPPED".to_string(),
                message: format!("{} messages were dropped due to slow client", n),
            }))
        }
        Err(broadcast::error::RecvError::Closed) => Delivery::Stop,
    }
}

async fn handle_client_message(
    text: &str,
    id: ConnectionId,
    service: &HarService,
    reply_tx: &mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event: ClientEvent = serde_json::from_str(text)?;
    if let Some(reply) = service.dispatch(id, event).await {
        reply_tx.send(reply)?;
    }
    Ok(())
}
