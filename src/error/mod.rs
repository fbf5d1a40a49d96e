// Error types for the SignSpeak engine
//
// Each subsystem owns a numbered error enum. Codes are grouped by range so
// log lines and HTTP payloads can be matched without parsing messages:
// - 1001-1008: configuration
// - 2001-2004: sentence enhancement backend
// - 3001-3008: ingestion line parsing
// - 4001-4002: pipeline lifecycle

mod config;
mod enhance;
mod parse;
mod pipeline;

pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use enhance::{log_enhance_error, EnhanceError, EnhanceErrorCodes};
pub use parse::{ParseError, ParseErrorCodes};
pub use pipeline::{PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so telemetry, HTTP and CLI surfaces report
/// failures consistently.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
