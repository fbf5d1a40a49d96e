// SampleStore - single point of truth for the latest sensor reading
//
// Ingestion workers (one per transport) write here concurrently; the polling
// loop and the HTTP layer read consistent snapshots. Every write is one
// critical section, so a reader sees either the previous or the next sample,
// never a mix of fields from both.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::{CanonicalSample, Vec3};
use crate::engine::clock::{now_timestamp_ms, TimeSource};
use crate::error::ParseError;

/// Partial update merged into the current sample
///
/// Absent fields keep their previous value. A present flex vector must have
/// the deployment's channel count or the whole update is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleUpdate {
    pub flex: Option<Vec<f32>>,
    pub accel: Option<Vec3>,
    pub gyro: Option<Vec3>,
}

impl From<CanonicalSample> for SampleUpdate {
    fn from(sample: CanonicalSample) -> Self {
        Self {
            flex: Some(sample.flex),
            accel: Some(sample.accel),
            gyro: Some(sample.gyro),
        }
    }
}

/// Consistent copy of the store contents
#[derive(Debug, Clone, Serialize)]
pub struct StoredSample {
    pub sample: CanonicalSample,
    /// Monotonic arrival instant; `None` until the first write
    #[serde(skip)]
    pub received_at: Option<Instant>,
    /// Wall-clock arrival time for presentation
    pub received_at_ms: Option<u64>,
    /// Incremented once per accepted write, 0 before the first one
    pub sequence: u64,
}

impl StoredSample {
    /// Age relative to `now`, `None` if nothing was ever written
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.received_at
            .map(|at| now.saturating_duration_since(at))
    }

    /// True when a sample exists and is no older than `window`
    pub fn is_live(&self, now: Instant, window: Duration) -> bool {
        self.age(now).map(|age| age <= window).unwrap_or(false)
    }
}

pub struct SampleStore {
    inner: RwLock<StoredSample>,
    flex_channels: usize,
    time_source: Arc<dyn TimeSource>,
}

impl SampleStore {
    /// Create a store holding a zeroed, never-received sample
    pub fn new(flex_channels: usize, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: RwLock::new(StoredSample {
                sample: CanonicalSample::zeroed(flex_channels),
                received_at: None,
                received_at_ms: None,
                sequence: 0,
            }),
            flex_channels,
            time_source,
        }
    }

    pub fn flex_channels(&self) -> usize {
        self.flex_channels
    }

    // Poisoning only means a writer panicked mid-assignment of plain data;
    // the previous value is still a complete sample.
    fn read_guard(&self) -> RwLockReadGuard<'_, StoredSample> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, StoredSample> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merge an update into the current sample and stamp its arrival
    ///
    /// # Returns
    /// * `Ok(sequence)` - sequence number assigned to the new sample
    /// * `Err(ParseError)` - update rejected, store unchanged
    pub fn update(&self, update: SampleUpdate) -> Result<u64, ParseError> {
        if let Some(flex) = &update.flex {
            if flex.len() != self.flex_channels {
                return Err(ParseError::FieldCount {
                    section: "FLEX",
                    expected: self.flex_channels,
                    found: flex.len(),
                });
            }
        }

        let mut guard = self.write_guard();
        let current = &guard.sample;
        let merged = CanonicalSample::new(
            update.flex.unwrap_or_else(|| current.flex.clone()),
            update.accel.unwrap_or(current.accel),
            update.gyro.unwrap_or(current.gyro),
            self.flex_channels,
        )?;

        guard.sample = merged;
        guard.received_at = Some(self.time_source.now());
        guard.received_at_ms = Some(now_timestamp_ms());
        guard.sequence += 1;
        Ok(guard.sequence)
    }

    /// Overwrite the whole sample
    pub fn replace(&self, sample: CanonicalSample) -> Result<u64, ParseError> {
        self.update(sample.into())
    }

    /// Consistent snapshot of the latest sample
    pub fn read(&self) -> StoredSample {
        self.read_guard().clone()
    }

    /// Age of the latest sample, `None` before the first write
    pub fn age(&self) -> Option<Duration> {
        self.read_guard().age(self.time_source.now())
    }

    pub fn sequence(&self) -> u64 {
        self.read_guard().sequence
    }
}
