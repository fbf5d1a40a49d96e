// Pipeline lifecycle error types and constants

use crate::error::{ConfigError, ErrorCode};
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 4001-4002
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// A polling loop is already running for this pipeline
    pub const ALREADY_RUNNING: i32 = 4001;

    /// Pipeline could not be built from the supplied configuration
    pub const INVALID_CONFIG: i32 = 4002;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// `run` called while another polling loop is active
    AlreadyRunning,

    /// Configuration failed validation
    InvalidConfig(ConfigError),
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::AlreadyRunning => PipelineErrorCodes::ALREADY_RUNNING,
            PipelineError::InvalidConfig(_) => PipelineErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::AlreadyRunning => {
                "Polling loop already running. Stop it before starting another.".to_string()
            }
            PipelineError::InvalidConfig(err) => {
                format!("Invalid configuration: {}", err.message())
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::InvalidConfig(err) => Some(err),
            PipelineError::AlreadyRunning => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::InvalidConfig(err)
    }
}
