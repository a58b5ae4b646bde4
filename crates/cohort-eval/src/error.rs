//! Compilation and evaluation errors

use cohort_codelist::CodelistError;
use cohort_diagnostics::{
    COH0100, COH0101, COH0102, COH0103, COH0104, COH0105, COH0106, COH0200, COH0202, COH0400,
    COH0401, Diagnostic, ErrorCode,
};
use cohort_model::{ModelError, PatientId};
use thiserror::Error;

/// Result type for compilation and evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while compiling a study or evaluating a patient
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A codelist could not be resolved or composed
    #[error(transparent)]
    Codelist(#[from] CodelistError),

    /// Patient data could not be loaded
    #[error(transparent)]
    Model(#[from] ModelError),

    /// An event query returns a field of the chosen event without saying
    /// which event to choose
    #[error("Variable '{variable}' returns {returning} but sets neither find_first_match_in_period nor find_last_match_in_period")]
    AmbiguousSelection { variable: String, returning: String },

    /// Variables depend on each other in a cycle
    #[error("Cyclic dependency between variables: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A categorisation has no catch-all branch, or more than one
    #[error("Categorisation '{variable}' must declare exactly one default branch, found {found}")]
    NoDefaultBranch { variable: String, found: usize },

    /// A predicate evaluates to unknown where a definite answer is required
    #[error("Predicate of '{context}' is indeterminate: {expression}")]
    IndeterminatePredicate { context: String, expression: String },

    /// A variable reference names nothing declared
    #[error("Unknown variable '{name}' referenced by '{referenced_by}'")]
    UnknownVariable { name: String, referenced_by: String },

    /// Operand or output types do not fit together
    #[error("Type mismatch in '{context}': expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Two variables share a name
    #[error("Variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },

    /// A relative date fell outside the supported calendar range
    #[error("Date arithmetic overflow in '{variable}': {expression}")]
    DateOverflow { variable: String, expression: String },

    /// Writing output failed
    #[error("Failed to write output: {message}")]
    Output { message: String },

    /// Internal error (should not happen)
    #[error("Internal evaluation error: {message}")]
    Internal { message: String },
}

impl EvalError {
    pub fn ambiguous_selection(variable: impl Into<String>, returning: impl Into<String>) -> Self {
        Self::AmbiguousSelection {
            variable: variable.into(),
            returning: returning.into(),
        }
    }

    pub fn unknown_variable(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        Self::UnknownVariable {
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn indeterminate(context: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::IndeterminatePredicate {
            context: context.into(),
            expression: expression.into(),
        }
    }

    pub fn date_overflow(variable: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::DateOverflow {
            variable: variable.into(),
            expression: expression.into(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Codelist(e) => e.code(),
            Self::Model(e) => e.code(),
            Self::AmbiguousSelection { .. } => COH0100,
            Self::CyclicDependency { .. } => COH0101,
            Self::NoDefaultBranch { .. } => COH0102,
            Self::IndeterminatePredicate { .. } => COH0103,
            Self::UnknownVariable { .. } => COH0104,
            Self::TypeMismatch { .. } => COH0105,
            Self::DuplicateVariable { .. } => COH0106,
            Self::DateOverflow { .. } => COH0202,
            Self::Output { .. } => COH0401,
            Self::Internal { .. } => COH0400,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}

/// A patient that could not be evaluated
///
/// Recorded per patient; the rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFailure {
    pub patient_id: PatientId,
    pub error: EvalError,
}

impl PatientFailure {
    pub fn code(&self) -> ErrorCode {
        self.error.code()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(COH0200, self.error.to_string())
            .with_subject(format!("patient {}", self.patient_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_phases() {
        assert!(EvalError::ambiguous_selection("bmi", "numeric_value").code().is_specification_error());
        assert!(
            EvalError::CyclicDependency {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
            .code()
            .is_specification_error()
        );
        assert!(EvalError::date_overflow("x", "index_date + 1 year").code().is_evaluation_error());
        assert!(
            EvalError::from(CodelistError::unknown_codelist("x"))
                .code()
                .is_configuration_error()
        );
    }

    #[test]
    fn test_cycle_message() {
        let err = EvalError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency between variables: a -> b -> a");
    }
}
