// Classifier - calibrated rule-based posture classification
//
// Pipeline for one sample:
// 1. Motion gate: gyro |x|+|y|+|z| above the threshold means the hand is
//    moving and nothing is classified
// 2. Normalization: clamp each flex channel into its calibrated range and
//    rescale to [0, 1]
// 3. Finger states through the hysteresis pair
// 4. Palm orientation from accelerometer z
// 5. Ordered rule table, first match wins
//
// The classifier holds no mutable state; the same sample always yields the
// same label.

use serde::Serialize;

use crate::analysis::rules::RuleTable;
use crate::calibration::{
    CalibrationProfile, FingerState, HysteresisThresholds, PalmLimits, PalmOrientation,
};
use crate::config::ClassifierConfig;
use crate::sample::CanonicalSample;

/// Full breakdown of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Gyroscope magnitude compared against the motion gate
    pub motion: f32,
    /// True when the motion gate suppressed the label
    pub gated: bool,
    /// Normalized value per calibrated channel, `None` if the sample lacks it
    pub normalized: Vec<Option<f32>>,
    pub fingers: Vec<FingerState>,
    pub palm: PalmOrientation,
    pub label: Option<String>,
}

pub struct Classifier {
    profile: CalibrationProfile,
    thresholds: HysteresisThresholds,
    palm_limits: PalmLimits,
    motion_threshold: f32,
    rules: RuleTable,
}

impl Classifier {
    /// Build from pre-validated parts
    pub fn new(
        profile: CalibrationProfile,
        thresholds: HysteresisThresholds,
        palm_limits: PalmLimits,
        motion_threshold: f32,
        rules: RuleTable,
    ) -> Self {
        Self {
            profile,
            thresholds,
            palm_limits,
            motion_threshold,
            rules,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.calibration.clone(),
            config.thresholds,
            config.palm,
            config.motion_threshold,
            config.rules.clone(),
        )
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// True when gyro activity exceeds the motion threshold
    pub fn is_moving(&self, sample: &CanonicalSample) -> bool {
        sample.gyro().abs_sum() > self.motion_threshold
    }

    /// Finger state per calibrated channel
    ///
    /// A channel the sample does not carry reads as BENT.
    pub fn finger_states(&self, sample: &CanonicalSample) -> Vec<FingerState> {
        self.profile
            .normalize_all(sample.flex())
            .into_iter()
            .map(|value| match value {
                Some(v) => self.thresholds.finger_state(v),
                None => FingerState::Bent,
            })
            .collect()
    }

    pub fn palm(&self, sample: &CanonicalSample) -> PalmOrientation {
        self.palm_limits.orientation(sample.accel().z)
    }

    /// Classify one sample into a gesture label, `None` for no gesture
    pub fn classify(&self, sample: &CanonicalSample) -> Option<&str> {
        if self.is_moving(sample) {
            return None;
        }
        let fingers = self.finger_states(sample);
        let palm = self.palm(sample);
        self.rules.first_match(&fingers, palm)
    }

    /// Classify and keep every intermediate value
    pub fn evaluate(&self, sample: &CanonicalSample) -> Classification {
        let motion = sample.gyro().abs_sum();
        let gated = motion > self.motion_threshold;
        let normalized = self.profile.normalize_all(sample.flex());
        let fingers = self.finger_states(sample);
        let palm = self.palm(sample);
        let label = if gated {
            None
        } else {
            self.rules.first_match(&fingers, palm).map(str::to_string)
        };

        Classification {
            motion,
            gated,
            normalized,
            fingers,
            palm,
            label,
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
