//! Cohort variable compilation and evaluation
//!
//! A [`StudyDefinition`] names a population predicate and a list of
//! [`VariableSpec`]s. [`compile`] validates it against a
//! [`CodelistRegistry`](cohort_codelist::CodelistRegistry):
//!
//! - every referenced variable and codelist exists
//! - the dependency graph has no cycles, and gives the evaluation order
//! - date-returning queries choose first or last match
//! - expression operands have comparable types
//!
//! The resulting [`CompiledStudy`] is evaluated per patient by
//! [`CohortEngine`], which runs batches in parallel and produces one
//! [`OutputRow`] per included patient. [`write_csv`] renders rows.
//!
//! # Example
//!
//! ```ignore
//! use cohort_eval::{CohortEngine, EventQuery, Returning, StudyDefinition, VariableSpec, compile};
//!
//! let definition = StudyDefinition::new(index_date, end_date).with_variable(VariableSpec::new(
//!     "sev_obesity",
//!     EventQuery::clinical("sev_obesity_codes")
//!         .on_or_before(DateExpr::index_date())
//!         .find_last_match_in_period()
//!         .returning(Returning::Date),
//! ));
//! let engine = CohortEngine::new(compile(&definition, &registry)?);
//! let result = engine.evaluate_batch(&patients);
//! ```

mod compiled;
pub mod compiler;
pub mod definition;
pub mod engine;
pub mod error;
pub mod logic;
pub mod output;
pub mod selection;
pub mod variable;

pub use compiled::{Column, CompiledStudy};
pub use compiler::{Compiler, compile};
pub use definition::StudyDefinition;
pub use engine::{BatchResult, CohortEngine, EvaluationSummary, OutputRow, PatientEvaluation};
pub use error::{EvalError, EvalResult, PatientFailure};
pub use output::{write_csv, write_csv_file};
pub use variable::{
    AddressAttribute, Branch, CategorisationRule, Condition, DateFormat, DateWindow, EventQuery,
    EventTable, PracticeAttribute, Returning, Selection, VaccinationQuery, VariableKind,
    VariableSpec,
};
