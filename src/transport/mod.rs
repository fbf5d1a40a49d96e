// Transport workers - deliver raw text lines to the ingestion adapter
//
// Workers never interpret the data they carry. A failed bind is retried
// after `retry_backoff_ms`; a dropped peer is logged and the listener keeps
// accepting. When nothing arrives, the store simply stops updating and the
// pipeline's liveness window turns the stale sample into "no gesture".

pub mod tcp;
pub mod udp;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::ingest::IngestAdapter;
use crate::telemetry::{TelemetryHub, TransportKind, TransportPhase};

/// Handles shared by every transport worker
#[derive(Clone)]
pub struct TransportContext {
    pub adapter: Arc<IngestAdapter>,
    pub telemetry: Arc<TelemetryHub>,
    pub retry_backoff: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl TransportContext {
    pub fn new(
        adapter: Arc<IngestAdapter>,
        telemetry: Arc<TelemetryHub>,
        retry_backoff: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            adapter,
            telemetry,
            retry_backoff,
            shutdown,
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) fn report(
        &self,
        kind: TransportKind,
        phase: TransportPhase,
        detail: impl Into<String>,
    ) {
        self.telemetry.record_transport(kind, phase, detail);
    }

    /// Sleep for the retry backoff; returns false if shutdown arrived first
    pub(crate) async fn backoff(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.retry_backoff) => !self.is_shutdown(),
            changed = self.shutdown.changed() => changed.is_ok() && !self.is_shutdown(),
        }
    }
}

/// Spawn one worker per configured listener address
pub fn spawn_transports(config: &TransportConfig, ctx: TransportContext) -> Vec<JoinHandle<()>> {
    let mut workers = Vec::new();
    if let Some(addr) = &config.tcp_addr {
        workers.push(tokio::spawn(tcp::serve(addr.clone(), ctx.clone())));
    }
    if let Some(addr) = &config.udp_addr {
        workers.push(tokio::spawn(udp::serve(addr.clone(), ctx.clone())));
    }
    if workers.is_empty() {
        log::warn!("[Transport] no listener configured; only local input will be ingested");
    }
    workers
}
