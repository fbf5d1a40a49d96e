// Stabilizer - debounce a noisy label stream into confirmation events
//
// A label must be observed `stability_threshold` times in a row before it is
// confirmed. Confirmation is edge-triggered: holding a confirmed gesture emits
// nothing further, and "none" clears the confirmed label so the same gesture
// can be confirmed again after the hand relaxes.

use serde::Serialize;

/// Externally visible state of the stabilizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilizerPhase {
    Waiting,
    Candidate { label: String, count: u32 },
    Confirmed { label: String },
}

/// Emitted once per newly stable label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub label: String,
    /// Consecutive observations when confirmed
    pub count: u32,
}

#[derive(Debug)]
pub struct Stabilizer {
    threshold: u32,
    current: Option<String>,
    count: u32,
    confirmed: Option<String>,
}

impl Stabilizer {
    /// Threshold values below 1 are raised to 1
    pub fn new(stability_threshold: u32) -> Self {
        Self {
            threshold: stability_threshold.max(1),
            current: None,
            count: 0,
            confirmed: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Feed one classifier output (`None` = no gesture)
    pub fn observe(&mut self, label: Option<&str>) -> Option<Confirmation> {
        if self.current.as_deref() == label {
            self.count = self.count.saturating_add(1);
        } else {
            self.current = label.map(str::to_string);
            self.count = 1;
        }

        let label = match label {
            Some(label) => label,
            None => {
                self.confirmed = None;
                return None;
            }
        };

        if self.count >= self.threshold && self.confirmed.as_deref() != Some(label) {
            self.confirmed = Some(label.to_string());
            log::debug!(
                "[Stabilizer] Confirmed {} after {} observations",
                label,
                self.count
            );
            return Some(Confirmation {
                label: label.to_string(),
                count: self.count,
            });
        }
        None
    }

    pub fn phase(&self) -> StabilizerPhase {
        match (&self.current, &self.confirmed) {
            (None, _) => StabilizerPhase::Waiting,
            (Some(current), Some(confirmed)) if current == confirmed => {
                StabilizerPhase::Confirmed {
                    label: confirmed.clone(),
                }
            }
            (Some(current), _) => StabilizerPhase::Candidate {
                label: current.clone(),
                count: self.count,
            },
        }
    }

    pub fn confirmed_label(&self) -> Option<&str> {
        self.confirmed.as_deref()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.count = 0;
        self.confirmed = None;
    }
}
