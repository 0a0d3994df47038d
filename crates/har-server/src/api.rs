//! HTTP router.
//!
//! | Method | Path             | Description                         |
//! |--------|------------------|-------------------------------------|
//! | GET    | `/ws`            | WebSocket for sensors and observers |
//! | GET    | `/health`        | Liveness and component readiness    |
//! | GET    | `/api/v1/status` | Current dashboard snapshot          |
//! | GET    | `/*`             | Dashboard page, when configured     |

use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::dto::{DashboardUpdate, HealthResponse};
use crate::service::HarService;
use crate::websocket::ws_handler;

/// Build the application router
pub fn create_router(service: HarService) -> Router {
    let static_dir = service.config().server.static_dir.clone();

    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/v1/status", get(status));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health(State(service): State<HarService>) -> Json<HealthResponse> {
    Json(service.health())
}

async fn status(State(service): State<HarService>) -> Json<DashboardUpdate> {
    Json(service.snapshot())
}
