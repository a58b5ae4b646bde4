//! Cohort diagnostics
//!
//! This crate provides the shared error-code numbering and the diagnostic
//! records reported while a study definition is loaded, compiled and run.
//! Each library crate keeps its own error enum and maps it onto an
//! [`ErrorCode`] from here.

mod diagnostic;
mod error_code;

pub use diagnostic::*;
pub use error_code::*;
