// Ingestion adapter - text lines in, canonical samples out
//
// Every transport hands raw lines to `IngestAdapter::ingest_line`. A line is
// either fully parsed and written to the sample store, or dropped and counted
// as noise. Nothing is ever partially applied.
//
// Format detection: a line containing `FLEX:` (any case) is the labeled
// format, anything else is comma-separated.

pub mod csv;
pub mod labeled;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ErrorCode, ParseError};
use crate::sample::{CanonicalSample, SampleStore};
use crate::telemetry::TelemetryHub;

/// Accepted / rejected line totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
}

pub struct IngestAdapter {
    store: Arc<SampleStore>,
    telemetry: Arc<TelemetryHub>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl IngestAdapter {
    pub fn new(store: Arc<SampleStore>, telemetry: Arc<TelemetryHub>) -> Self {
        Self {
            store,
            telemetry,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    /// Parse one line without touching the store
    ///
    /// Surrounding whitespace and a trailing `\r` are ignored.
    pub fn parse_line(&self, line: &str) -> Result<CanonicalSample, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }
        let flex_channels = self.store.flex_channels();
        if labeled::detect(line) {
            labeled::parse(line, flex_channels)
        } else {
            csv::parse(line, flex_channels)
        }
    }

    /// Parse one line and write it to the store
    ///
    /// Never fails: malformed lines are logged at debug level, counted and
    /// reported to telemetry. Empty lines are skipped without counting.
    ///
    /// # Returns
    /// `true` when the line was written to the store
    pub fn ingest_line(&self, line: &str) -> bool {
        let result = self
            .parse_line(line)
            .and_then(|sample| self.store.replace(sample));

        match result {
            Ok(sequence) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                log::trace!("[Ingest] sample #{} stored", sequence);
                true
            }
            Err(ParseError::Empty) => false,
            Err(err) => {
                log::debug!("[Ingest] dropped line {:?}: {}", line.trim(), err.message());
                self.reject(&err);
                false
            }
        }
    }

    /// Count a line dropped before it could be parsed (e.g. over-long stream lines)
    pub fn reject(&self, err: &ParseError) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.telemetry.record_line_rejected(err.kind(), err.message());
    }

    /// Feed several lines (a TCP read chunk or a multi-line datagram)
    ///
    /// # Returns
    /// Number of lines written to the store
    pub fn ingest_chunk(&self, chunk: &str) -> usize {
        chunk.lines().filter(|line| self.ingest_line(line)).count()
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Parse comma-split tokens into finite floats
pub(crate) fn parse_numbers<'a>(
    tokens: impl Iterator<Item = &'a str>,
) -> Result<Vec<f32>, ParseError> {
    tokens
        .map(|token| {
            let token = token.trim();
            let value: f32 = token.parse().map_err(|_| ParseError::NotNumeric {
                token: token.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ParseError::NotFinite {
                    token: token.to_string(),
                });
            }
            Ok(value)
        })
        .collect()
}
