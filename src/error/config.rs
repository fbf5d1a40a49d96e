// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 1001-1008
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const UNREADABLE: i32 = 1001;

    /// Config file is not valid JSON for `AppConfig`
    pub const INVALID_JSON: i32 = 1002;

    /// Calibration profile is empty, non-finite, or has `min >= max`
    pub const INVALID_CALIBRATION: i32 = 1003;

    /// Hysteresis thresholds violate `0 <= low < high <= 1`
    pub const INVALID_THRESHOLDS: i32 = 1004;

    /// Palm orientation limits violate `down_limit < up_limit`
    pub const INVALID_PALM_LIMITS: i32 = 1005;

    /// A rule pattern does not cover every calibrated channel
    pub const INVALID_RULE: i32 = 1006;

    /// Stability threshold must be at least 1
    pub const INVALID_STABILITY: i32 = 1007;

    /// Poll rate, delta trigger or timeout settings out of range
    pub const INVALID_TIMING: i32 = 1008;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=AppConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File could not be read from disk
    Unreadable { path: String, reason: String },

    /// File contents are not a valid configuration document
    InvalidJson { reason: String },

    /// Calibration profile rejected
    InvalidCalibration { reason: String },

    /// Hysteresis pair rejected
    InvalidThresholds { low: f32, high: f32 },

    /// Palm limits rejected
    InvalidPalmLimits { up_limit: f32, down_limit: f32 },

    /// Rule table entry rejected
    InvalidRule { index: usize, reason: String },

    /// Stabilizer threshold of zero
    InvalidStability,

    /// Timing or delta trigger setting out of range
    InvalidTiming { reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Unreadable { .. } => ConfigErrorCodes::UNREADABLE,
            ConfigError::InvalidJson { .. } => ConfigErrorCodes::INVALID_JSON,
            ConfigError::InvalidCalibration { .. } => ConfigErrorCodes::INVALID_CALIBRATION,
            ConfigError::InvalidThresholds { .. } => ConfigErrorCodes::INVALID_THRESHOLDS,
            ConfigError::InvalidPalmLimits { .. } => ConfigErrorCodes::INVALID_PALM_LIMITS,
            ConfigError::InvalidRule { .. } => ConfigErrorCodes::INVALID_RULE,
            ConfigError::InvalidStability => ConfigErrorCodes::INVALID_STABILITY,
            ConfigError::InvalidTiming { .. } => ConfigErrorCodes::INVALID_TIMING,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Unreadable { path, reason } => {
                format!("Failed to read config file {}: {}", path, reason)
            }
            ConfigError::InvalidJson { reason } => format!("Invalid config JSON: {}", reason),
            ConfigError::InvalidCalibration { reason } => {
                format!("Invalid calibration profile: {}", reason)
            }
            ConfigError::InvalidThresholds { low, high } => format!(
                "Hysteresis thresholds must satisfy 0 <= low < high <= 1 (got low={}, high={})",
                low, high
            ),
            ConfigError::InvalidPalmLimits {
                up_limit,
                down_limit,
            } => format!(
                "Palm limits must satisfy down_limit < up_limit (got up={}, down={})",
                up_limit, down_limit
            ),
            ConfigError::InvalidRule { index, reason } => {
                format!("Invalid rule #{}: {}", index, reason)
            }
            ConfigError::InvalidStability => {
                "Stability threshold must be at least 1".to_string()
            }
            ConfigError::InvalidTiming { reason } => format!("Invalid timing setting: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::InvalidJson {
            reason: err.to_string(),
        }
    }
}
