//! Patient data errors

use cohort_diagnostics::{COH0203, COH0401, COH0404, Diagnostic, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for patient data operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while loading patient data
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Reading the patient data failed
    #[error("Failed to read patient data from {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The patient data is not valid JSON for the record schema
    #[error("Invalid patient data in {origin}: {message}")]
    Json { origin: String, message: String },

    /// Two records share a patient id
    #[error("Duplicate record for patient {patient_id}")]
    DuplicatePatient { patient_id: u64 },
}

impl ModelError {
    pub fn json(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Json {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => COH0401,
            Self::Json { .. } => COH0404,
            Self::DuplicatePatient { .. } => COH0203,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
