//! GesturePipeline: composition root of the gesture engine.
//!
//! Owns one instance of every component (store, ingestion adapter,
//! classifier, stabilizer, delta trigger, dispatcher) and drives the
//! single-flight polling loop that connects them. Transports and the HTTP
//! layer only receive the `Arc` handles exposed here.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::analysis::classifier::{Classification, Classifier};
use crate::analysis::delta::DeltaTrigger;
use crate::analysis::stabilizer::{Stabilizer, StabilizerPhase};
use crate::config::{AppConfig, SourceMode};
use crate::dispatch::{DispatchTicket, Dispatcher, Enhancer};
use crate::engine::clock::{SystemTimeSource, TimeSource};
use crate::error::PipelineError;
use crate::ingest::IngestAdapter;
use crate::sample::{SampleStore, StoredSample};
use crate::telemetry::{GestureSource, TelemetryHub};

/// Outcome of one polling step.
#[derive(Debug)]
pub struct PollReport {
    /// Store sequence seen by this poll
    pub sequence: u64,
    /// False when the sample was missing or older than the liveness window
    pub live: bool,
    /// Posture classifier output (always `None` when the posture source is off)
    pub label: Option<String>,
    pub phase: StabilizerPhase,
    /// Word emitted by the delta trigger, if it fired
    pub delta_word: Option<String>,
    /// Confirmations handed to the dispatcher during this poll
    pub dispatched: Vec<DispatchTicket>,
}

/// Latest sample with its classification breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SampleView {
    #[serde(flatten)]
    pub stored: StoredSample,
    pub live: bool,
    pub age_ms: Option<u64>,
    pub classification: Classification,
}

pub struct GesturePipeline {
    config: AppConfig,
    time_source: Arc<dyn TimeSource>,
    telemetry: Arc<TelemetryHub>,
    store: Arc<SampleStore>,
    adapter: Arc<IngestAdapter>,
    classifier: Classifier,
    stabilizer: Mutex<Stabilizer>,
    delta: Mutex<DeltaTrigger>,
    dispatcher: Arc<Dispatcher>,
    liveness_window: Duration,
    running: AtomicBool,
    polls: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GesturePipeline {
    /// Build every component from a validated configuration.
    pub fn new(
        config: AppConfig,
        enhancer: Arc<dyn Enhancer>,
        telemetry: Arc<TelemetryHub>,
    ) -> Result<Self, PipelineError> {
        Self::with_time_source(
            config,
            enhancer,
            telemetry,
            Arc::new(SystemTimeSource::default()),
        )
    }

    /// Same as `new` with an injected clock (replay and tests).
    pub fn with_time_source(
        config: AppConfig,
        enhancer: Arc<dyn Enhancer>,
        telemetry: Arc<TelemetryHub>,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let store = Arc::new(SampleStore::new(
            config.ingest.flex_channels,
            Arc::clone(&time_source),
        ));
        let adapter = Arc::new(IngestAdapter::new(
            Arc::clone(&store),
            Arc::clone(&telemetry),
        ));
        let classifier = Classifier::from_config(&config.classifier);
        let stabilizer = Mutex::new(Stabilizer::new(config.stabilizer.stability_threshold));
        let delta = Mutex::new(DeltaTrigger::from_config(&config.delta));
        let dispatcher = Arc::new(Dispatcher::from_config(
            &config.dispatch,
            enhancer,
            Arc::clone(&telemetry),
        ));
        let liveness_window = Duration::from_millis(config.classifier.liveness_window_ms);

        log::info!(
            "[Pipeline] built: {} flex channels, {} rules, source {:?}",
            config.ingest.flex_channels,
            config.classifier.rules.len(),
            config.pipeline.source
        );

        Ok(Self {
            config,
            time_source,
            telemetry,
            store,
            adapter,
            classifier,
            stabilizer,
            delta,
            dispatcher,
            liveness_window,
            running: AtomicBool::new(false),
            polls: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<SampleStore> {
        Arc::clone(&self.store)
    }

    pub fn adapter(&self) -> Arc<IngestAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn telemetry(&self) -> Arc<TelemetryHub> {
        Arc::clone(&self.telemetry)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn source(&self) -> SourceMode {
        self.config.pipeline.source
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stabilizer_phase(&self) -> StabilizerPhase {
        lock(&self.stabilizer).phase()
    }

    /// Latest sample, its freshness, and what the classifier makes of it.
    pub fn sample_view(&self) -> SampleView {
        let stored = self.store.read();
        let now = self.time_source.now();
        let classification = self.classifier.evaluate(&stored.sample);
        SampleView {
            live: stored.is_live(now, self.liveness_window),
            age_ms: stored.age(now).map(|age| age.as_millis() as u64),
            classification,
            stored,
        }
    }

    /// Run one snapshot -> classify -> stabilize -> dispatch step.
    pub fn poll_once(&self) -> PollReport {
        self.polls.fetch_add(1, Ordering::Relaxed);
        let stored = self.store.read();
        let now = self.time_source.now();
        let live = stored.is_live(now, self.liveness_window);
        let source = self.config.pipeline.source;
        let mut dispatched = Vec::new();

        let label = if source.posture_enabled() && live {
            self.classifier.classify(&stored.sample).map(str::to_string)
        } else {
            None
        };

        let phase = {
            let mut stabilizer = lock(&self.stabilizer);
            if source.posture_enabled() {
                if let Some(confirmation) = stabilizer.observe(label.as_deref()) {
                    dispatched.push(
                        self.dispatcher
                            .confirm(&confirmation.label, GestureSource::Posture),
                    );
                }
            }
            stabilizer.phase()
        };

        let delta_word = if source.delta_enabled() {
            let event = lock(&self.delta).observe(&stored.sample, stored.sequence, now);
            event.map(|event| {
                dispatched.push(self.dispatcher.confirm(&event.word, GestureSource::Delta));
                event.word
            })
        } else {
            None
        };

        PollReport {
            sequence: stored.sequence,
            live,
            label,
            phase,
            delta_word,
            dispatched,
        }
    }

    /// Poll at `pipeline.poll_rate_hz` until `shutdown` turns true.
    ///
    /// Only one loop may run per pipeline; a concurrent call returns
    /// `PipelineError::AlreadyRunning`. Missed ticks are skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }

        let period = Duration::from_secs_f32(1.0 / self.config.pipeline.poll_rate_hz);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("[Pipeline] polling every {:?}", period);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.poll_once();
                    for ticket in &report.dispatched {
                        log::debug!("[Pipeline] dispatched epoch {}", ticket.epoch);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        log::info!("[Pipeline] polling stopped after {} polls", self.polls());
        Ok(())
    }
}
