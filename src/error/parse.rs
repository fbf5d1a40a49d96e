// Ingestion parse error types and constants
//
// Parse errors never leave the ingestion adapter: a rejected line is noise,
// counted and logged at debug level. The typed error exists so the adapter,
// telemetry and tests can tell the rejection reasons apart.

use crate::error::ErrorCode;
use std::fmt;

/// Parse error code constants
///
/// Error code range: 3001-3008
pub struct ParseErrorCodes {}

impl ParseErrorCodes {
    /// Line was empty after trimming
    pub const EMPTY: i32 = 3001;

    /// Wrong number of fields for the configured layout
    pub const FIELD_COUNT: i32 = 3002;

    /// A labeled section (FLEX/ACC/GYR) is missing
    pub const MISSING_SECTION: i32 = 3003;

    /// A token is not a number
    pub const NOT_NUMERIC: i32 = 3004;

    /// A token parsed to NaN or infinity
    pub const NOT_FINITE: i32 = 3005;

    /// A labeled section appears more than once
    pub const DUPLICATE_SECTION: i32 = 3006;

    /// A labeled section uses a label other than FLEX/ACC/GYR
    pub const UNKNOWN_SECTION: i32 = 3007;

    /// A stream line exceeded the transport's length limit
    pub const LINE_TOO_LONG: i32 = 3008;
}

/// Reasons a line is rejected by the ingestion adapter
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    FieldCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    MissingSection {
        section: &'static str,
    },
    NotNumeric {
        token: String,
    },
    NotFinite {
        token: String,
    },
    DuplicateSection {
        section: &'static str,
    },
    UnknownSection {
        label: String,
    },
    LineTooLong {
        limit: usize,
    },
}

impl ParseError {
    /// Short stable identifier used in telemetry events
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Empty => "empty",
            ParseError::FieldCount { .. } => "field_count",
            ParseError::MissingSection { .. } => "missing_section",
            ParseError::NotNumeric { .. } => "not_numeric",
            ParseError::NotFinite { .. } => "not_finite",
            ParseError::DuplicateSection { .. } => "duplicate_section",
            ParseError::UnknownSection { .. } => "unknown_section",
            ParseError::LineTooLong { .. } => "line_too_long",
        }
    }
}

impl ErrorCode for ParseError {
    fn code(&self) -> i32 {
        match self {
            ParseError::Empty => ParseErrorCodes::EMPTY,
            ParseError::FieldCount { .. } => ParseErrorCodes::FIELD_COUNT,
            ParseError::MissingSection { .. } => ParseErrorCodes::MISSING_SECTION,
            ParseError::NotNumeric { .. } => ParseErrorCodes::NOT_NUMERIC,
            ParseError::NotFinite { .. } => ParseErrorCodes::NOT_FINITE,
            ParseError::DuplicateSection { .. } => ParseErrorCodes::DUPLICATE_SECTION,
            ParseError::UnknownSection { .. } => ParseErrorCodes::UNKNOWN_SECTION,
            ParseError::LineTooLong { .. } => ParseErrorCodes::LINE_TOO_LONG,
        }
    }

    fn message(&self) -> String {
        match self {
            ParseError::Empty => "Empty line".to_string(),
            ParseError::FieldCount {
                section,
                expected,
                found,
            } => format!(
                "Expected {} fields in {} section, found {}",
                expected, section, found
            ),
            ParseError::MissingSection { section } => {
                format!("Missing {} section", section)
            }
            ParseError::NotNumeric { token } => format!("Non-numeric token '{}'", token),
            ParseError::NotFinite { token } => format!("Non-finite value '{}'", token),
            ParseError::DuplicateSection { section } => {
                format!("Duplicated {} section", section)
            }
            ParseError::UnknownSection { label } => format!("Unknown section label '{}'", label),
            ParseError::LineTooLong { limit } => {
                format!("Line longer than {} bytes", limit)
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParseError::{} (code {}): {}",
            self.kind(),
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ParseError {}
