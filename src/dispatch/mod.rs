// Dispatcher - fast templated output plus stale-safe background enhancement
//
// Each confirmation bumps the epoch and publishes the templated sentence in
// the same critical section. A background task then asks the enhancer for a
// better sentence and publishes it only if no newer confirmation has arrived
// in the meantime. Tasks are never cancelled; a superseded result is simply
// discarded when the epoch check fails.

pub mod enhancer;
pub mod templates;

pub use enhancer::{enhancer_from_config, Enhancer, HttpEnhancer, PassthroughEnhancer};
pub use templates::{default_tables, SentenceTemplates, TemplateTables};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::error::{log_enhance_error, EnhanceError, ErrorCode};
use crate::telemetry::{GestureSource, TelemetryHub};

/// Sentence shown before the first confirmation
pub const WAITING_SENTENCE: &str = "Waiting for gesture...";

/// Where the published sentence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputSource {
    Template,
    Enhanced,
}

/// Latest published output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutput {
    pub gesture_label: Option<String>,
    pub sentence_text: String,
    pub language: String,
    pub epoch: u64,
    pub source: OutputSource,
}

impl DispatchOutput {
    fn waiting(language: &str) -> Self {
        Self {
            gesture_label: None,
            sentence_text: WAITING_SENTENCE.to_string(),
            language: language.to_string(),
            epoch: 0,
            source: OutputSource::Template,
        }
    }
}

/// Result of `Dispatcher::confirm`
#[derive(Debug)]
pub struct DispatchTicket {
    pub epoch: u64,
    /// Templated output published synchronously
    pub output: DispatchOutput,
    /// Background enhancement, `None` when enhancement is disabled
    pub enhancement: Option<JoinHandle<()>>,
}

impl DispatchTicket {
    /// Wait for the background enhancement to finish (if any)
    pub async fn settled(self) {
        if let Some(handle) = self.enhancement {
            if let Err(err) = handle.await {
                log::warn!(
                    "[Dispatcher] enhancement task for epoch {} ended abnormally: {}",
                    self.epoch,
                    err
                );
            }
        }
    }
}

struct DispatchState {
    epoch: u64,
    language: String,
    output: DispatchOutput,
}

struct Shared {
    state: Mutex<DispatchState>,
    tx: broadcast::Sender<DispatchOutput>,
    telemetry: Arc<TelemetryHub>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the output only if `epoch` is still current
    fn publish_enhanced(&self, epoch: u64, text: String) {
        let mut state = self.lock();
        if state.epoch != epoch {
            let current = state.epoch;
            drop(state);
            log::debug!(
                "[Dispatcher] discarding enhancement for epoch {} (current {})",
                epoch,
                current
            );
            self.telemetry.record_enhancement_discarded(epoch, current);
            return;
        }

        state.output.sentence_text = text;
        state.output.source = OutputSource::Enhanced;
        let output = state.output.clone();
        let _ = self.tx.send(output.clone());
        drop(state);

        log::info!("[Dispatcher] epoch {} enhanced ({})", epoch, output.language);
        self.telemetry
            .record_enhancement_applied(epoch, &output.language);
    }
}

pub struct Dispatcher {
    shared: Arc<Shared>,
    templates: SentenceTemplates,
    enhancer: Arc<dyn Enhancer>,
    enhance: bool,
    enhance_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        templates: SentenceTemplates,
        enhancer: Arc<dyn Enhancer>,
        enhance: bool,
        enhance_timeout: Duration,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        let language = templates.default_language().to_string();
        let (tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DispatchState {
                    epoch: 0,
                    output: DispatchOutput::waiting(&language),
                    language,
                }),
                tx,
                telemetry,
            }),
            templates,
            enhancer,
            enhance,
            enhance_timeout,
        }
    }

    pub fn from_config(
        config: &DispatchConfig,
        enhancer: Arc<dyn Enhancer>,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        Self::new(
            SentenceTemplates::new(config.default_language.clone(), config.templates.clone()),
            enhancer,
            config.enhance,
            Duration::from_millis(config.enhance_timeout_ms),
            telemetry,
        )
    }

    pub fn templates(&self) -> &SentenceTemplates {
        &self.templates
    }

    /// Language used for subsequent confirmations
    pub fn set_language(&self, language: &str) {
        let language = language.trim();
        if language.is_empty() {
            return;
        }
        let mut state = self.shared.lock();
        if state.language != language {
            log::info!("[Dispatcher] language {} -> {}", state.language, language);
            state.language = language.to_string();
        }
    }

    pub fn language(&self) -> String {
        self.shared.lock().language.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.shared.lock().epoch
    }

    pub fn latest(&self) -> DispatchOutput {
        self.shared.lock().output.clone()
    }

    /// Latest output rendered in `language`
    ///
    /// The published output is left untouched. When its language differs, the
    /// templated sentence for the current label is resolved again under the
    /// same epoch.
    pub fn latest_in(&self, language: &str) -> DispatchOutput {
        let language = language.trim();
        let mut output = self.latest();
        if language.is_empty() || output.language == language {
            return output;
        }
        if let Some(label) = output.gesture_label.as_deref() {
            output.sentence_text = self.templates.resolve(label, language);
            output.language = language.to_string();
            output.source = OutputSource::Template;
        }
        output
    }

    /// Every published output (templated and enhanced)
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutput> {
        self.shared.tx.subscribe()
    }

    /// Handle a confirmed gesture
    ///
    /// Publishes the templated sentence immediately and, when enhancement is
    /// enabled and a tokio runtime is available, spawns the enhancement task
    /// tagged with the new epoch.
    pub fn confirm(&self, label: &str, source: GestureSource) -> DispatchTicket {
        let (epoch, output) = {
            let mut state = self.shared.lock();
            state.epoch += 1;
            let sentence = self.templates.resolve(label, &state.language);
            state.output = DispatchOutput {
                gesture_label: Some(label.to_string()),
                sentence_text: sentence,
                language: state.language.clone(),
                epoch: state.epoch,
                source: OutputSource::Template,
            };
            let _ = self.shared.tx.send(state.output.clone());
            (state.epoch, state.output.clone())
        };

        log::info!(
            "[Dispatcher] epoch {} confirmed {} -> {:?}",
            epoch,
            label,
            output.sentence_text
        );
        self.shared.telemetry.record_confirmation(label, source, epoch);

        let enhancement = if self.enhance {
            self.spawn_enhancement(epoch, output.sentence_text.clone(), output.language.clone())
        } else {
            None
        };

        DispatchTicket {
            epoch,
            output,
            enhancement,
        }
    }

    fn spawn_enhancement(
        &self,
        epoch: u64,
        text: String,
        language: String,
    ) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("[Dispatcher] no async runtime, epoch {} stays templated", epoch);
                return None;
            }
        };

        let shared = Arc::clone(&self.shared);
        let enhancer = Arc::clone(&self.enhancer);
        let timeout = self.enhance_timeout;

        Some(runtime.spawn(async move {
            let pending = enhancer.enhance(&text, &language);
            let result = match tokio::time::timeout(timeout, pending).await {
                Ok(result) => result,
                Err(_) => Err(EnhanceError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(enhanced) => shared.publish_enhanced(epoch, enhanced),
                Err(err) => {
                    log_enhance_error(&err, "Dispatcher::confirm");
                    shared
                        .telemetry
                        .record_enhancement_failed(epoch, err.code(), err.message());
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use tokio::sync::Semaphore;

    use crate::telemetry::PipelineEvent;

    /// Uppercases the text once the gate hands out a permit
    struct GatedEnhancer {
        gate: Option<Arc<Semaphore>>,
        fail: bool,
    }

    impl Enhancer for GatedEnhancer {
        fn enhance<'a>(
            &'a self,
            text: &'a str,
            _language: &'a str,
        ) -> BoxFuture<'a, Result<String, EnhanceError>> {
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    if let Ok(permit) = gate.acquire().await {
                        permit.forget();
                    }
                }
                if self.fail {
                    return Err(EnhanceError::Transport {
                        reason: "offline".to_string(),
                    });
                }
                Ok(text.to_uppercase())
            })
        }
    }

    fn dispatcher(enhancer: GatedEnhancer, timeout_ms: u64) -> (Dispatcher, Arc<TelemetryHub>) {
        let telemetry = Arc::new(TelemetryHub::default());
        let dispatcher = Dispatcher::new(
            SentenceTemplates::new("en", default_tables()),
            Arc::new(enhancer),
            true,
            Duration::from_millis(timeout_ms),
            telemetry.clone(),
        );
        (dispatcher, telemetry)
    }

    #[test]
    fn initial_output_is_waiting() {
        let (dispatcher, _) = dispatcher(GatedEnhancer { gate: None, fail: false }, 100);
        let output = dispatcher.latest();
        assert_eq!(output.gesture_label, None);
        assert_eq!(output.sentence_text, WAITING_SENTENCE);
        assert_eq!(output.epoch, 0);
    }

    #[test]
    fn confirm_without_runtime_stays_templated() {
        let (dispatcher, _) = dispatcher(GatedEnhancer { gate: None, fail: false }, 100);
        let ticket = dispatcher.confirm("HELLO", GestureSource::Posture);
        assert_eq!(ticket.epoch, 1);
        assert!(ticket.enhancement.is_none());
        assert_eq!(dispatcher.latest().sentence_text, "Hello, I am Yash.");
        assert_eq!(dispatcher.latest().source, OutputSource::Template);
    }

    #[tokio::test]
    async fn enhancement_replaces_current_epoch() {
        let (dispatcher, telemetry) = dispatcher(GatedEnhancer { gate: None, fail: false }, 500);
        let ticket = dispatcher.confirm("HELLO", GestureSource::Posture);
        assert_eq!(ticket.output.source, OutputSource::Template);
        ticket.settled().await;

        let output = dispatcher.latest();
        assert_eq!(output.sentence_text, "HELLO, I AM YASH.");
        assert_eq!(output.source, OutputSource::Enhanced);
        assert_eq!(output.epoch, 1);
        assert_eq!(telemetry.counters().enhancements_applied, 1);
    }

    #[tokio::test]
    async fn stale_enhancement_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let (dispatcher, telemetry) = dispatcher(
            GatedEnhancer {
                gate: Some(gate.clone()),
                fail: false,
            },
            2_000,
        );

        let first = dispatcher.confirm("HELLO", GestureSource::Posture);
        let second = dispatcher.confirm("TEAM_FSOCIETY", GestureSource::Posture);
        assert_eq!(dispatcher.latest().epoch, 2);

        // Release both waiting enhancements
        gate.add_permits(2);
        first.settled().await;
        second.settled().await;

        let output = dispatcher.latest();
        assert_eq!(output.epoch, 2);
        assert_eq!(output.gesture_label.as_deref(), Some("TEAM_FSOCIETY"));
        assert_eq!(output.sentence_text, "AND WE ARE TEAM FSOCIETY.");
        assert_eq!(telemetry.counters().enhancements_discarded, 1);
        assert_eq!(telemetry.counters().enhancements_applied, 1);
    }

    #[tokio::test]
    async fn failure_keeps_template() {
        let (dispatcher, telemetry) = dispatcher(GatedEnhancer { gate: None, fail: true }, 500);
        dispatcher.confirm("HELLO", GestureSource::Delta).settled().await;

        let output = dispatcher.latest();
        assert_eq!(output.sentence_text, "Hello, I am Yash.");
        assert_eq!(output.source, OutputSource::Template);
        assert!(telemetry.snapshot().recent.iter().any(|event| matches!(
            event,
            PipelineEvent::EnhancementFailed { code: 2002, .. }
        )));
    }

    #[tokio::test]
    async fn timeout_keeps_template() {
        let gate = Arc::new(Semaphore::new(0));
        let (dispatcher, telemetry) = dispatcher(
            GatedEnhancer {
                gate: Some(gate),
                fail: false,
            },
            50,
        );
        dispatcher.confirm("HELLO", GestureSource::Posture).settled().await;

        assert_eq!(dispatcher.latest().source, OutputSource::Template);
        assert!(telemetry.snapshot().recent.iter().any(|event| matches!(
            event,
            PipelineEvent::EnhancementFailed { code: 2001, .. }
        )));
    }

    #[tokio::test]
    async fn language_applies_to_next_confirmation() {
        let (dispatcher, _) = dispatcher(GatedEnhancer { gate: None, fail: false }, 500);
        dispatcher.set_language("hi");
        let ticket = dispatcher.confirm("HELLO", GestureSource::Posture);
        assert_eq!(ticket.output.language, "hi");
        assert_eq!(ticket.output.sentence_text, "नमस्ते, मैं यश हूँ।");

        // Unknown label in a known language falls back to the raw label
        let ticket = dispatcher.confirm("THANKS", GestureSource::Posture);
        assert_eq!(ticket.output.sentence_text, "THANKS");
    }

    #[tokio::test]
    async fn latest_in_re_resolves_current_label() {
        let (dispatcher, _) = dispatcher(GatedEnhancer { gate: None, fail: false }, 500);
        assert_eq!(dispatcher.latest_in("hi").sentence_text, WAITING_SENTENCE);

        dispatcher.confirm("HELLO", GestureSource::Posture).settled().await;
        assert_eq!(dispatcher.latest().source, OutputSource::Enhanced);

        let output = dispatcher.latest_in("hi");
        assert_eq!(output.language, "hi");
        assert_eq!(output.sentence_text, "नमस्ते, मैं यश हूँ।");
        assert_eq!(output.source, OutputSource::Template);
        assert_eq!(output.epoch, 1);

        // Same language returns the published (enhanced) output
        assert_eq!(dispatcher.latest_in(" en "), dispatcher.latest());
        // Labels missing from the table fall back to the default language
        dispatcher.confirm("WE", GestureSource::Posture).settled().await;
        assert_eq!(dispatcher.latest_in("mr").sentence_text, "We are here together.");
        assert_eq!(dispatcher.latest().language, "en");
    }

    #[tokio::test]
    async fn subscribers_see_template_then_enhanced() {
        let (dispatcher, _) = dispatcher(GatedEnhancer { gate: None, fail: false }, 500);
        let mut rx = dispatcher.subscribe();
        dispatcher.confirm("WE", GestureSource::Posture).settled().await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.source, OutputSource::Template);
        assert_eq!(second.source, OutputSource::Enhanced);
        assert_eq!(second.epoch, first.epoch);
    }

    #[tokio::test]
    async fn disabled_enhancement_spawns_nothing() {
        let telemetry = Arc::new(TelemetryHub::default());
        let dispatcher = Dispatcher::new(
            SentenceTemplates::new("en", default_tables()),
            Arc::new(PassthroughEnhancer),
            false,
            Duration::from_millis(100),
            telemetry,
        );
        let ticket = dispatcher.confirm("HELLO", GestureSource::Posture);
        assert!(ticket.enhancement.is_none());
    }
}
