// CalibrationProfile - threshold storage for posture classification
//
// Ranges run bent -> straight: `min` is the reading of a fully curled finger,
// `max` the reading of a fully extended one. Thresholds use two cut points so
// a value hovering near one boundary reads as TRANSITIONAL instead of
// flipping between BENT and STRAIGHT.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Discrete finger posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FingerState {
    Bent,
    Straight,
    Transitional,
}

/// Palm orientation derived from the accelerometer z axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalmOrientation {
    PalmUp,
    PalmDown,
    Tilted,
}

/// Raw reading range of one flex channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    /// Reading when the finger is fully bent
    pub min: f32,
    /// Reading when the finger is fully straight
    pub max: f32,
}

impl ChannelRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into `[min, max]` and rescale to `[0, 1]`
    pub fn normalize(&self, raw: f32) -> f32 {
        let clamped = raw.clamp(self.min, self.max);
        (clamped - self.min) / (self.max - self.min)
    }
}

/// Hysteresis pair on normalized values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisThresholds {
    /// At or below: BENT
    pub low: f32,
    /// At or above: STRAIGHT
    pub high: f32,
}

impl Default for HysteresisThresholds {
    fn default() -> Self {
        Self {
            low: 0.35,
            high: 0.65,
        }
    }
}

impl HysteresisThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.low) || !in_unit(self.high) || self.low >= self.high {
            return Err(ConfigError::InvalidThresholds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn finger_state(&self, normalized: f32) -> FingerState {
        if normalized >= self.high {
            FingerState::Straight
        } else if normalized <= self.low {
            FingerState::Bent
        } else {
            FingerState::Transitional
        }
    }
}

/// Accelerometer z limits for palm orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PalmLimits {
    pub up_limit: f32,
    pub down_limit: f32,
}

impl Default for PalmLimits {
    fn default() -> Self {
        Self {
            up_limit: 0.5,
            down_limit: -0.5,
        }
    }
}

impl PalmLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.up_limit.is_finite()
            || !self.down_limit.is_finite()
            || self.down_limit >= self.up_limit
        {
            return Err(ConfigError::InvalidPalmLimits {
                up_limit: self.up_limit,
                down_limit: self.down_limit,
            });
        }
        Ok(())
    }

    pub fn orientation(&self, accel_z: f32) -> PalmOrientation {
        if accel_z > self.up_limit {
            PalmOrientation::PalmUp
        } else if accel_z < self.down_limit {
            PalmOrientation::PalmDown
        } else {
            PalmOrientation::Tilted
        }
    }
}

/// Per-channel calibration ranges, in flex channel order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationProfile {
    channels: Vec<ChannelRange>,
}

impl CalibrationProfile {
    pub fn new(channels: Vec<ChannelRange>) -> Self {
        Self { channels }
    }

    /// Same range on `count` channels
    pub fn uniform(count: usize, range: ChannelRange) -> Self {
        Self {
            channels: vec![range; count],
        }
    }

    pub fn channels(&self) -> &[ChannelRange] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Validate against the deployment's flex channel count
    ///
    /// # Validation
    /// - At least one channel, no more than `flex_channels`
    /// - Every range finite with `min < max`
    pub fn validate(&self, flex_channels: usize) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::InvalidCalibration {
                reason: "profile has no channels".to_string(),
            });
        }
        if self.channels.len() > flex_channels {
            return Err(ConfigError::InvalidCalibration {
                reason: format!(
                    "profile has {} channels but samples carry {}",
                    self.channels.len(),
                    flex_channels
                ),
            });
        }
        for (i, range) in self.channels.iter().enumerate() {
            if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
                return Err(ConfigError::InvalidCalibration {
                    reason: format!(
                        "channel {}: min {} must be below max {}",
                        i, range.min, range.max
                    ),
                });
            }
        }
        Ok(())
    }

    /// Normalize one channel; `None` when the profile has no such channel
    pub fn normalize(&self, channel: usize, raw: f32) -> Option<f32> {
        self.channels.get(channel).map(|range| range.normalize(raw))
    }

    /// Normalized values for every calibrated channel
    ///
    /// Channels missing from `flex` yield `None`; flex values beyond the
    /// profile are ignored.
    pub fn normalize_all(&self, flex: &[f32]) -> Vec<Option<f32>> {
        self.channels
            .iter()
            .enumerate()
            .map(|(i, range)| flex.get(i).map(|raw| range.normalize(*raw)))
            .collect()
    }
}

impl Default for CalibrationProfile {
    /// Glove ranges measured on the reference hardware (index, middle, ring, pinky)
    fn default() -> Self {
        Self::new(vec![
            ChannelRange::new(0.29, 0.45),
            ChannelRange::new(0.01, 1.00),
            ChannelRange::new(0.25, 0.60),
            ChannelRange::new(0.15, 1.00),
        ])
    }
}
