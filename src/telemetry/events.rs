//! Telemetry event types exposed to CLI/HTTP surfaces.

use serde::{Deserialize, Serialize};

/// Which gesture source produced a confirmation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GestureSource {
    Posture,
    Delta,
}

/// Line transports feeding the ingestion adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Tcp,
    Udp,
}

/// Lifecycle stages reported by transport workers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportPhase {
    Listening,
    PeerConnected,
    PeerDisconnected,
    Failed,
}

/// Pipeline events published to the telemetry hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    LineRejected {
        reason: String,
        detail: String,
    },
    GestureConfirmed {
        label: String,
        source: GestureSource,
        epoch: u64,
    },
    EnhancementApplied {
        epoch: u64,
        language: String,
    },
    EnhancementDiscarded {
        epoch: u64,
        current_epoch: u64,
    },
    EnhancementFailed {
        epoch: u64,
        code: i32,
        reason: String,
    },
    Transport {
        transport: TransportKind,
        phase: TransportPhase,
        detail: String,
        timestamp_ms: u64,
    },
}
