//! HAR inference server.
//!
//! ```text
//! har-server --model models/har_model.onnx --scaler models/har_scaler.json \
//!            --label-encoder models/har_label_encoder.json
//! ```
//!
//! The dashboard is served from `./static` unless `--static-dir` points
//! elsewhere or `--no-static` is given.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use har_nn::ModelBundle;
use har_server::{create_router, HarConfig, HarService};
use tracing::{info, warn};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "har-server", version, about = "Real-time activity recognition server")]
struct Args {
    /// JSON configuration file; command-line flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Classifier model
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Fitted scaler parameters
    #[arg(long, value_name = "PATH")]
    scaler: Option<PathBuf>,

    /// Label encoder classes
    #[arg(long, value_name = "PATH")]
    label_encoder: Option<PathBuf>,

    /// Directory served at `/` (default: static)
    #[arg(long, value_name = "DIR", conflicts_with = "no_static")]
    static_dir: Option<PathBuf>,

    /// Do not serve the dashboard page
    #[arg(long)]
    no_static: bool,

    /// Samples per inference window
    #[arg(long)]
    window_size: Option<usize>,

    /// Samples between inferences
    #[arg(long)]
    stride: Option<usize>,
}

impl Args {
    fn apply(self, cfg: &mut HarConfig) {
        if let Some(bind) = self.bind {
            cfg.server.bind = bind;
        }
        if let Some(model) = self.model {
            cfg.artifacts.paths.model = model;
        }
        if let Some(scaler) = self.scaler {
            cfg.artifacts.paths.scaler = scaler;
        }
        if let Some(encoder) = self.label_encoder {
            cfg.artifacts.paths.label_encoder = encoder;
        }
        if let Some(dir) = self.static_dir {
            cfg.server.static_dir = Some(dir);
        }
        if self.no_static {
            cfg.server.static_dir = None;
        }
        if let Some(window) = self.window_size {
            cfg.stream.window_size = window;
        }
        if let Some(stride) = self.stride {
            cfg.stream.stride = stride;
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HarConfig::from_json(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!(
        window_size = config.stream.window_size,
        stride = config.stream.stride,
        buffer_capacity = config.stream.buffer_capacity(),
        sampling_rate_hz = config.stream.sampling_rate_hz,
        "Starting har-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let bundle = ModelBundle::load(
        &config.artifacts.paths,
        &config.artifacts.inference,
        config.stream.window_size,
        config.stream.num_features(),
    );

    if let Some(dir) = config.server.static_dir.as_ref().filter(|d| !d.is_dir()) {
        warn!(dir = %dir.display(), "Static directory not found, dashboard page unavailable");
    }

    let bind = config.server.bind;
    let service = HarService::new(config, bundle);
    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!("Listening on {bind}, websocket at ws://{bind}/ws");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
