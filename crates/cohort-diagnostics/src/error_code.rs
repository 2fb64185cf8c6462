//! Cohort error codes following a structured numbering system
//!
//! Error code ranges:
//! - COH0001-COH0099: Parse errors (anchor and population expressions)
//! - COH0100-COH0199: Definition errors (arguments, references, codelists)
//! - COH0200-COH0299: Resolution errors (reference resolver)
//! - COH0400-COH0499: System errors (I/O, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_definition_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COH{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(3, ErrorInfo::new("Invalid identifier"));
    map.insert(4, ErrorInfo::new("Invalid date literal")
        .with_help("Dates are written as YYYY-MM-DD"));
    map.insert(5, ErrorInfo::new("Invalid offset unit")
        .with_help("Use day(s), month(s) or year(s)"));
    map.insert(6, ErrorInfo::new("Invalid number"));
    map.insert(7, ErrorInfo::new("Trailing input"));
    map.insert(8, ErrorInfo::new("Unterminated string literal"));

    // Definition errors (0100-0199)
    map.insert(100, ErrorInfo::new("Invalid argument"));
    map.insert(101, ErrorInfo::new("Undefined variable reference")
        .with_help("Check that the variable is declared in the study definition"));
    map.insert(102, ErrorInfo::new("Duplicate variable"));
    map.insert(103, ErrorInfo::new("Circular reference"));
    map.insert(104, ErrorInfo::new("Mixed coding systems")
        .with_help("Only codelists from the same coding system can be combined"));
    map.insert(105, ErrorInfo::new("Empty codelist combination"));
    map.insert(106, ErrorInfo::new("Invalid return expectations"));
    map.insert(107, ErrorInfo::new("Query cannot be anchored")
        .with_help("Chains need a query that searches a date period"));
    map.insert(108, ErrorInfo::new("Missing study population"));
    map.insert(109, ErrorInfo::new("No return expectations")
        .with_help("Set return_expectations on the variable or default_expectations on the study"));
    map.insert(110, ErrorInfo::new("Unbounded search period"));

    // Resolution errors (0200-0299)
    map.insert(200, ErrorInfo::new("Resolution failed"));
    map.insert(201, ErrorInfo::new("Date arithmetic overflow"));
    map.insert(202, ErrorInfo::new("Unknown event source"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Missing configuration key"));
    map.insert(404, ErrorInfo::new("Invalid format"));

    map
});

// Parse errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);
pub const COH0006: ErrorCode = ErrorCode::new(6);
pub const COH0007: ErrorCode = ErrorCode::new(7);
pub const COH0008: ErrorCode = ErrorCode::new(8);

// Definition errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);
pub const COH0104: ErrorCode = ErrorCode::new(104);
pub const COH0105: ErrorCode = ErrorCode::new(105);
pub const COH0106: ErrorCode = ErrorCode::new(106);
pub const COH0107: ErrorCode = ErrorCode::new(107);
pub const COH0108: ErrorCode = ErrorCode::new(108);
pub const COH0109: ErrorCode = ErrorCode::new(109);
pub const COH0110: ErrorCode = ErrorCode::new(110);

// Resolution errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);
pub const COH0202: ErrorCode = ErrorCode::new(202);

// System errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
pub const COH0403: ErrorCode = ErrorCode::new(403);
pub const COH0404: ErrorCode = ErrorCode::new(404);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(COH0001.to_string(), "COH0001");
        assert_eq!(COH0100.to_string(), "COH0100");
    }

    #[test]
    fn test_error_categories() {
        assert!(COH0004.is_parse_error());
        assert!(!COH0004.is_definition_error());
        assert!(COH0101.is_definition_error());
        assert!(COH0201.is_resolution_error());
        assert!(COH0402.is_system_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(COH0102.info().description, "Duplicate variable");
        assert!(COH0104.info().help.is_some());
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
