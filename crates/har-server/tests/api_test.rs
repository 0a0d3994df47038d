//! HTTP surface tests driven through the router with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use har_nn::{LabelDecoder, MockBackend, ModelBundle, StandardScaler};
use har_server::{create_router, HarConfig, HarService};
use serde_json::Value;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ready_bundle() -> ModelBundle {
    ModelBundle::new(
        Box::new(MockBackend::new(vec![0.9, 0.1])),
        StandardScaler::new(vec![0.0; 6], vec![1.0; 6]).unwrap(),
        LabelDecoder::new(vec!["A".into(), "B".into()]).unwrap(),
        60,
        6,
    )
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok_when_ready() {
    let app = create_router(HarService::new(HarConfig::default(), ready_bundle()));
    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sensor_clients"], 0);
    assert_eq!(body["components"]["model_loaded"], true);
    assert_eq!(body["inference"]["total_inferences"], 0);
}

#[tokio::test]
async fn health_reports_degraded_without_artifacts() {
    let bundle = ModelBundle::from_parts(None, None, None, 60, 6);
    let app = create_router(HarService::new(HarConfig::default(), bundle));
    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["encoder_loaded"], false);
}

#[tokio::test]
async fn status_returns_dashboard_snapshot() {
    let app = create_router(HarService::new(HarConfig::default(), ready_bundle()));
    let (status, body) = get_json(app, "/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_count"], 0);
    assert_eq!(body["config"]["window_size"], 60);
    assert_eq!(body["config"]["stride"], 30);
    assert_eq!(body["config"]["sampling_rate"], 20.0);
    assert_eq!(body["config"]["classes"], serde_json::json!(["A", "B"]));
    assert!(body["latest_predictions"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn static_dir_is_served_at_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>dashboard</h1>").unwrap();

    let mut config = HarConfig::default();
    config.server.static_dir = Some(dir.path().to_path_buf());
    let app = create_router(HarService::new(config, ready_bundle()));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>dashboard</h1>");
}

#[tokio::test]
async fn unknown_path_is_not_found_without_static_dir() {
    let mut config = HarConfig::default();
    config.server.static_dir = None;
    let app = create_router(HarService::new(config, ready_bundle()));
    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn default_config_serves_bundled_dashboard() {
    // Integration tests run from the crate root, next to static/
    let app = create_router(HarService::new(HarConfig::default(), ready_bundle()));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8_lossy(&bytes);
    assert!(page.contains("get_initial_dashboard_state"));
    // Class labels and ids are rendered as text nodes
    assert!(page.contains("textContent"));
    assert!(!page.contains("innerHTML"));
}
