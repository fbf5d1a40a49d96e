//! HTTP surface, compiled with the `http` feature.
//!
//! An Axum server exposing the latest output (with language selection),
//! the latest sample breakdown, metrics, a line ingestion endpoint and two
//! SSE streams (published outputs and pipeline telemetry).

pub mod routes;
pub mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::core::GesturePipeline;

pub use routes::{build_router, run_http_server, HttpServerError, HttpState};

/// Spawn the HTTP server on the current runtime.
pub fn spawn(
    pipeline: Arc<GesturePipeline>,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = run_http_server(HttpState::new(pipeline), addr, shutdown).await {
            log::error!("[Http] server stopped: {:#}", err);
        }
    })
}
