//! Cohort error codes following a structured numbering system
//!
//! Error code ranges:
//! - COH0001-COH0099: Configuration errors (codelist sources, registry)
//! - COH0100-COH0199: Specification errors (variable definitions, predicates)
//! - COH0200-COH0299: Evaluation errors (per patient)
//! - COH0400-COH0499: System errors (I/O, file formats)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

    /// Check if this is a configuration error (0001-0099)
    pub const fn is_configuration_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a specification error (0100-0199)
    pub const fn is_specification_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an evaluation error (0200-0299)
    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a system error (0400-0499)
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

    // Configuration errors (0001-0099)
    map.insert(1, ErrorInfo::new("Codelist source not found")
        .with_help("Check the codelist directory and the file name in the manifest"));
    map.insert(2, ErrorInfo::new("Malformed codelist entry"));
    map.insert(3, ErrorInfo::new("Unknown category"));
    map.insert(4, ErrorInfo::new("Conflicting category")
        .with_help("Combine with an explicit conflict policy to choose which category wins"));
    map.insert(5, ErrorInfo::new("Unknown codelist"));
    map.insert(6, ErrorInfo::new("Duplicate codelist"));

    // Specification errors (0100-0199)
    map.insert(100, ErrorInfo::new("Ambiguous event selection")
        .with_help("Set find_first_match_in_period or find_last_match_in_period"));
    map.insert(101, ErrorInfo::new("Cyclic variable dependency"));
    map.insert(102, ErrorInfo::new("Categorisation without default branch"));
    map.insert(103, ErrorInfo::new("Indeterminate predicate"));
    map.insert(104, ErrorInfo::new("Unknown variable")
        .with_help("Check that the variable is declared in the study definition"));
    map.insert(105, ErrorInfo::new("Type mismatch"));
    map.insert(106, ErrorInfo::new("Duplicate variable"));
    map.insert(107, ErrorInfo::new("Unused codelist"));
    map.insert(108, ErrorInfo::new("Window outside study period"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Patient evaluation failed"));
    map.insert(201, ErrorInfo::new("Malformed event skipped"));
    map.insert(202, ErrorInfo::new("Date arithmetic overflow"));
    map.insert(203, ErrorInfo::new("Duplicate patient record")
        .with_help("Each patient id must appear once in the patient data"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Invalid CSV"));
    map.insert(404, ErrorInfo::new("Invalid JSON"));

    map
});

// Configuration errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);
pub const COH0006: ErrorCode = ErrorCode::new(6);

// Specification errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);
pub const COH0104: ErrorCode = ErrorCode::new(104);
pub const COH0105: ErrorCode = ErrorCode::new(105);
pub const COH0106: ErrorCode = ErrorCode::new(106);
pub const COH0107: ErrorCode = ErrorCode::new(107);
pub const COH0108: ErrorCode = ErrorCode::new(108);

// Evaluation errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);
pub const COH0202: ErrorCode = ErrorCode::new(202);
pub const COH0203: ErrorCode = ErrorCode::new(203);

// System errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
pub const COH0403: ErrorCode = ErrorCode::new(403);
pub const COH0404: ErrorCode = ErrorCode::new(404);
