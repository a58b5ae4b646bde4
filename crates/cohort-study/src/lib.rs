//! COVID-19 vaccine uptake cohort study
//!
//! This crate ties the cohort toolkit to one concrete study:
//! - The codelists it reads and the lists derived from them
//! - The main extract and the flow chart variant
//! - JSON run configuration
//! - A runner that loads, compiles, evaluates and writes the output CSV
//!
//! # Example
//!
//! ```ignore
//! use cohort_study::{StudyConfig, extract};
//!
//! let config = StudyConfig::from_json_file("study.json")?;
//! let report = extract(&config)?;
//! println!("{}", report.summary);
//! ```

// Re-export the toolkit crates
pub use cohort_codelist as codelist;
pub use cohort_diagnostics as diagnostics;
pub use cohort_eval as eval;
pub use cohort_expr as expr;
pub use cohort_model as model;

pub mod codelists;
pub mod config;
pub mod error;
pub mod runner;
pub mod study;

pub use codelists::study_manifest;
pub use config::StudyConfig;
pub use error::{StudyError, StudyResult};
pub use runner::{ExtractReport, compile_study, extract, load_manifest, load_registry};
pub use study::{StudyVariant, VaccineUptakeStudy};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
