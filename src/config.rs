//! Configuration management for the gesture pipeline
//!
//! One JSON document configures every component. It is read once at startup
//! and never changes during a run. Every section has defaults, so a file only
//! needs to carry the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::rules::RuleTable;
use crate::calibration::{CalibrationProfile, HysteresisThresholds, PalmLimits};
use crate::dispatch::templates::{default_tables, TemplateTables};
use crate::error::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub classifier: ClassifierConfig,
    pub stabilizer: StabilizerConfig,
    pub dispatch: DispatchConfig,
    pub delta: DeltaConfig,
    pub pipeline: PipelineConfig,
    pub transport: TransportConfig,
    pub http: HttpConfig,
}

/// Line parsing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Flex values per sample (fixed per deployment)
    pub flex_channels: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { flex_channels: 5 }
    }
}

/// Calibrated posture classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub calibration: CalibrationProfile,
    pub thresholds: HysteresisThresholds,
    /// Gyro |x|+|y|+|z| above this suppresses classification
    pub motion_threshold: f32,
    pub palm: PalmLimits,
    pub rules: RuleTable,
    /// Samples older than this are treated as no data
    pub liveness_window_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationProfile::default(),
            thresholds: HysteresisThresholds::default(),
            motion_threshold: 0.15,
            palm: PalmLimits::default(),
            rules: RuleTable::default(),
            liveness_window_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Consecutive identical labels required for a confirmation
    pub stability_threshold: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 5,
        }
    }
}

/// Sentence output and enhancement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub default_language: String,
    /// language -> label -> sentence
    pub templates: TemplateTables,
    /// Launch background enhancement after each confirmation
    pub enhance: bool,
    pub enhance_timeout_ms: u64,
    /// Enhancement backend URL; passthrough when absent
    pub endpoint: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            templates: default_tables(),
            enhance: true,
            enhance_timeout_ms: 3000,
            endpoint: None,
        }
    }
}

/// Motion-delta gesture source parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    pub movement_threshold: f32,
    pub cooldown_ms: u64,
    /// Emitted in order, wrapping around
    pub words: Vec<String>,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 0.3,
            cooldown_ms: 1000,
            words: ["Hello,", "I", "am", "Yash.", "We", "Are", "Team", "Fsociety"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// Which gesture sources feed the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    #[default]
    Posture,
    Delta,
    Both,
}

impl SourceMode {
    pub fn posture_enabled(self) -> bool {
        matches!(self, SourceMode::Posture | SourceMode::Both)
    }

    pub fn delta_enabled(self) -> bool {
        matches!(self, SourceMode::Delta | SourceMode::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub poll_rate_hz: f32,
    pub source: SourceMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: 10.0,
            source: SourceMode::Posture,
        }
    }
}

/// Line transport listeners (both optional)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub tcp_addr: Option<String>,
    pub udp_addr: Option<String>,
    /// Wait before rebinding a failed listener
    pub retry_backoff_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_addr: None,
            udp_addr: None,
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

fn timing(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidTiming {
        reason: reason.into(),
    }
}

impl AppConfig {
    /// Load and validate configuration from a JSON file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Loaded, validated configuration
    /// * `Err(ConfigError)` - Unreadable file, bad JSON, or a failed invariant
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Unreadable {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    ///
    /// A file that exists but is invalid is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            log::warn!(
                "[Config] Config file {:?} not found. Using defaults.",
                path.as_ref()
            );
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Check every cross-field invariant
    pub fn validate(&self) -> Result<(), ConfigError> {
        let classifier = &self.classifier;

        if self.ingest.flex_channels == 0 {
            return Err(ConfigError::InvalidCalibration {
                reason: "ingest.flex_channels must be at least 1".to_string(),
            });
        }
        classifier
            .calibration
            .validate(self.ingest.flex_channels)?;
        classifier.thresholds.validate()?;
        classifier.palm.validate()?;
        classifier.rules.validate(classifier.calibration.len())?;
        if !classifier.motion_threshold.is_finite() || classifier.motion_threshold < 0.0 {
            return Err(timing(format!(
                "classifier.motion_threshold must be >= 0 (got {})",
                classifier.motion_threshold
            )));
        }
        if classifier.liveness_window_ms == 0 {
            return Err(timing("classifier.liveness_window_ms must be > 0"));
        }

        if self.stabilizer.stability_threshold == 0 {
            return Err(ConfigError::InvalidStability);
        }

        if self.dispatch.default_language.trim().is_empty() {
            return Err(timing("dispatch.default_language must not be empty"));
        }
        if self.dispatch.enhance_timeout_ms == 0 {
            return Err(timing("dispatch.enhance_timeout_ms must be > 0"));
        }

        if !(self.pipeline.poll_rate_hz.is_finite() && self.pipeline.poll_rate_hz > 0.0) {
            return Err(timing(format!(
                "pipeline.poll_rate_hz must be > 0 (got {})",
                self.pipeline.poll_rate_hz
            )));
        }

        if !self.delta.movement_threshold.is_finite() || self.delta.movement_threshold < 0.0 {
            return Err(timing(format!(
                "delta.movement_threshold must be >= 0 (got {})",
                self.delta.movement_threshold
            )));
        }
        if self.pipeline.source.delta_enabled() && self.delta.words.is_empty() {
            return Err(timing("delta.words must not be empty when the delta source is on"));
        }

        Ok(())
    }
}
