// Sentence enhancement error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Enhancement error code constants
///
/// Error code range: 2001-2004
pub struct EnhanceErrorCodes {}

impl EnhanceErrorCodes {
    /// Backend did not answer within the dispatch timeout
    pub const TIMEOUT: i32 = 2001;

    /// Backend could not be reached
    pub const TRANSPORT: i32 = 2002;

    /// Backend answered with a non-success status
    pub const BAD_STATUS: i32 = 2003;

    /// Backend answer could not be decoded or was empty
    pub const INVALID_RESPONSE: i32 = 2004;
}

/// Log an enhancement failure
///
/// Enhancement failures are recoverable by contract (the templated sentence
/// stays published), so they are logged at warn level rather than error.
pub fn log_enhance_error(err: &EnhanceError, context: &str) {
    warn!(
        "Enhance error in {}: code={}, component=Enhancer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors returned by an `Enhancer` implementation
#[derive(Debug, Clone, PartialEq)]
pub enum EnhanceError {
    /// No answer within the allotted time
    Timeout { timeout_ms: u64 },

    /// Connection-level failure
    Transport { reason: String },

    /// Non-2xx HTTP status
    BadStatus { status: u16, body: String },

    /// Undecodable or empty payload
    InvalidResponse { reason: String },
}

impl ErrorCode for EnhanceError {
    fn code(&self) -> i32 {
        match self {
            EnhanceError::Timeout { .. } => EnhanceErrorCodes::TIMEOUT,
            EnhanceError::Transport { .. } => EnhanceErrorCodes::TRANSPORT,
            EnhanceError::BadStatus { .. } => EnhanceErrorCodes::BAD_STATUS,
            EnhanceError::InvalidResponse { .. } => EnhanceErrorCodes::INVALID_RESPONSE,
        }
    }

    fn message(&self) -> String {
        match self {
            EnhanceError::Timeout { timeout_ms } => {
                format!("Enhancement timed out after {} ms", timeout_ms)
            }
            EnhanceError::Transport { reason } => {
                format!("Failed to reach enhancement backend: {}", reason)
            }
            EnhanceError::BadStatus { status, body } => {
                format!("Enhancement backend returned HTTP {}: {}", status, body)
            }
            EnhanceError::InvalidResponse { reason } => {
                format!("Invalid enhancement response: {}", reason)
            }
        }
    }
}

impl fmt::Display for EnhanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EnhanceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for EnhanceError {}

impl From<reqwest::Error> for EnhanceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EnhanceError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            EnhanceError::Transport {
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_error_codes() {
        assert_eq!(
            EnhanceError::Timeout { timeout_ms: 10 }.code(),
            EnhanceErrorCodes::TIMEOUT
        );
        assert_eq!(
            EnhanceError::BadStatus {
                status: 503,
                body: String::new()
            }
            .code(),
            EnhanceErrorCodes::BAD_STATUS
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = EnhanceError::Timeout { timeout_ms: 3000 };
        assert_eq!(err.message(), "Enhancement timed out after 3000 ms");
    }
}
