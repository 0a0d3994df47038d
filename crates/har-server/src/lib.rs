//! # har-server
//!
//! Real-time human activity recognition over websockets.
//!
//! Mobile clients stream 6-axis inertial samples (accelerometer and
//! gyroscope). For each client the service keeps a bounded buffer, and once
//! a full window is available it classifies the latest window every
//! `stride` samples. The prediction goes back to that client, and a
//! dashboard snapshot is broadcast to every observer connection.
//!
//! ## Modules
//!
//! - [`codec`] - raw records to canonical samples
//! - [`buffer`] - bounded per-client sample buffer
//! - [`policy`] - stride trigger and per-stream state
//! - [`session`] - connection registry
//! - [`service`] - event dispatcher
//! - [`websocket`] / [`api`] - network surface
//!
//! Inference itself lives in [`har_nn`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod dto;
pub mod error;
pub mod policy;
pub mod service;
pub mod session;
pub mod websocket;

pub use api::create_router;
pub use buffer::WindowBuffer;
pub use codec::{FeatureCodec, SensorSample};
pub use config::HarConfig;
pub use dto::{ClientEvent, DashboardUpdate, ServerEvent};
pub use error::{ConfigError, StreamError, StreamResult};
pub use policy::{StreamPhase, StreamState, WindowingPolicy};
pub use service::HarService;
pub use session::{ConnectionId, SessionRegistry};
