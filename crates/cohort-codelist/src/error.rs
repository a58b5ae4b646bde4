//! Codelist errors

use cohort_diagnostics::{
    COH0001, COH0002, COH0003, COH0004, COH0005, COH0006, COH0401, COH0403, COH0404, Diagnostic,
    ErrorCode,
};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for codelist operations
pub type CodelistResult<T> = Result<T, CodelistError>;

/// Errors raised while loading or composing codelists
///
/// All of these are configuration-time failures: no cohort can be built
/// while any of them is outstanding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodelistError {
    /// The source file does not exist
    #[error("Codelist source not found: {}", path.display())]
    MissingSource { path: PathBuf },

    /// A required column is missing or a row has no code
    #[error("Malformed entry in {origin} at line {line}: {message}")]
    MalformedEntry {
        origin: String,
        line: u64,
        message: String,
    },

    /// A requested category label does not occur in the codelist
    #[error("Unknown category '{category}' in codelist {codelist}")]
    UnknownCategory { codelist: String, category: String },

    /// The same code carries different categories in the combined inputs
    #[error("Conflicting categories for {code}: '{first}' and '{second}'")]
    ConflictingCategory {
        code: String,
        first: String,
        second: String,
    },

    /// No codelist registered under this name
    #[error("Unknown codelist: {name}")]
    UnknownCodelist { name: String },

    /// A codelist is already registered under this name
    #[error("Duplicate codelist: {name}")]
    DuplicateCodelist { name: String },

    /// Reading the source failed
    #[error("I/O error reading {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The delimited file could not be parsed
    #[error("Invalid CSV in {origin}: {message}")]
    Csv { origin: String, message: String },

    /// The manifest could not be parsed
    #[error("Invalid codelist manifest: {message}")]
    Manifest { message: String },
}

impl CodelistError {
    /// Create a malformed entry error
    pub fn malformed(origin: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an unknown category error
    pub fn unknown_category(codelist: impl Into<String>, category: impl Into<String>) -> Self {
        Self::UnknownCategory {
            codelist: codelist.into(),
            category: category.into(),
        }
    }

    /// Create an unknown codelist error
    pub fn unknown_codelist(name: impl Into<String>) -> Self {
        Self::UnknownCodelist { name: name.into() }
    }

    /// Create a duplicate codelist error
    pub fn duplicate_codelist(name: impl Into<String>) -> Self {
        Self::DuplicateCodelist { name: name.into() }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingSource { .. } => COH0001,
            Self::MalformedEntry { .. } => COH0002,
            Self::UnknownCategory { .. } => COH0003,
            Self::ConflictingCategory { .. } => COH0004,
            Self::UnknownCodelist { .. } => COH0005,
            Self::DuplicateCodelist { .. } => COH0006,
            Self::Io { .. } => COH0401,
            Self::Csv { .. } => COH0403,
            Self::Manifest { .. } => COH0404,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_configuration_errors() {
        assert!(CodelistError::unknown_codelist("x").code().is_configuration_error());
        assert!(
            CodelistError::malformed("a.csv", 3, "empty code")
                .code()
                .is_configuration_error()
        );
        assert!(
            CodelistError::Csv {
                origin: "a.csv".into(),
                message: "bad".into()
            }
            .code()
            .is_system_error()
        );
    }

    #[test]
    fn test_display() {
        let err = CodelistError::unknown_category("smoking", "X");
        assert_eq!(err.to_string(), "Unknown category 'X' in codelist smoking");
    }
}
