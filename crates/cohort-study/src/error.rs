//! Study run errors

use cohort_codelist::CodelistError;
use cohort_diagnostics::{COH0402, Diagnostic, ErrorCode};
use cohort_eval::EvalError;
use cohort_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

pub type StudyResult<T> = Result<T, StudyError>;

/// Anything that stops a study run before output is written
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Codelist(#[from] CodelistError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The configuration file is missing, unreadable or invalid
    #[error("Invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl StudyError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Codelist(e) => e.code(),
            Self::Model(e) => e.code(),
            Self::Eval(e) => e.code(),
            Self::Config { .. } => COH0402,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
