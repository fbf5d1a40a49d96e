//! Pipeline telemetry collector and helpers.
//!
//! The collector multiplexes rejected lines, confirmations, enhancement
//! outcomes and transport lifecycle events into a bounded history plus an
//! async broadcast stream. The hub is created by the composition root and
//! shared through `Arc`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::engine::clock::now_timestamp_ms;

pub mod events;

pub use events::{GestureSource, PipelineEvent, TransportKind, TransportPhase};

/// Per-kind event totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TelemetryCounters {
    pub lines_rejected: u64,
    pub confirmations: u64,
    pub enhancements_applied: u64,
    pub enhancements_discarded: u64,
    pub enhancements_failed: u64,
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<PipelineEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub counters: TelemetryCounters,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<PipelineEvent>,
    history: Mutex<VecDeque<PipelineEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<PipelineEvent>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn publish(&self, event: PipelineEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    fn recent(&self) -> Vec<PipelineEvent> {
        self.history().iter().cloned().collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

#[derive(Default)]
struct Counters {
    lines_rejected: AtomicU64,
    confirmations: AtomicU64,
    enhancements_applied: AtomicU64,
    enhancements_discarded: AtomicU64,
    enhancements_failed: AtomicU64,
}

impl Counters {
    fn load(&self) -> TelemetryCounters {
        TelemetryCounters {
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            enhancements_applied: self.enhancements_applied.load(Ordering::Relaxed),
            enhancements_discarded: self.enhancements_discarded.load(Ordering::Relaxed),
            enhancements_failed: self.enhancements_failed.load(Ordering::Relaxed),
        }
    }
}

/// Top-level hub wrapping the collector plus per-kind counters.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    counters: Counters,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            counters: Counters::default(),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.collector.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events.load(Ordering::Relaxed),
            dropped_events: self.collector.dropped_history.load(Ordering::Relaxed),
            counters: self.counters.load(),
        }
    }

    pub fn counters(&self) -> TelemetryCounters {
        self.counters.load()
    }

    pub fn record_line_rejected(&self, reason: &str, detail: impl Into<String>) {
        self.counters.lines_rejected.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(PipelineEvent::LineRejected {
            reason: reason.to_string(),
            detail: detail.into(),
        });
    }

    pub fn record_confirmation(&self, label: &str, source: GestureSource, epoch: u64) {
        self.counters.confirmations.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(PipelineEvent::GestureConfirmed {
            label: label.to_string(),
            source,
            epoch,
        });
    }

    pub fn record_enhancement_applied(&self, epoch: u64, language: &str) {
        self.counters
            .enhancements_applied
            .fetch_add(1, Ordering::Relaxed);
        self.collector.publish(PipelineEvent::EnhancementApplied {
            epoch,
            language: language.to_string(),
        });
    }

    pub fn record_enhancement_discarded(&self, epoch: u64, current_epoch: u64) {
        self.counters
            .enhancements_discarded
            .fetch_add(1, Ordering::Relaxed);
        self.collector.publish(PipelineEvent::EnhancementDiscarded {
            epoch,
            current_epoch,
        });
    }

    pub fn record_enhancement_failed(&self, epoch: u64, code: i32, reason: impl Into<String>) {
        self.counters
            .enhancements_failed
            .fetch_add(1, Ordering::Relaxed);
        self.collector.publish(PipelineEvent::EnhancementFailed {
            epoch,
            code,
            reason: reason.into(),
        });
    }

    pub fn record_transport(
        &self,
        transport: TransportKind,
        phase: TransportPhase,
        detail: impl Into<String>,
    ) {
        self.collector.publish(PipelineEvent::Transport {
            transport,
            phase,
            detail: detail.into(),
            timestamp_ms: now_timestamp_ms(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}
