//! Cohort patient data model
//!
//! This crate provides:
//! - [`PatientRecord`] with its coded events, vaccinations, practice
//!   registrations and addresses
//! - point-in-time queries over a record (age, registration, address)
//! - the [`PatientSource`] seam through which patient histories are loaded
//!   before evaluation, with in-memory and JSON file implementations

pub mod error;
pub mod event;
mod lenient;
pub mod patient;
pub mod source;

pub use error::{ModelError, ModelResult};
pub use event::{CodedEvent, VaccinationRecord};
pub use patient::{Address, PatientId, PatientRecord, Registration, Sex};
pub use source::{InMemorySource, JsonFileSource, PatientSource};
