//! Clinical codelists
//!
//! A codelist is a named set of clinical codes, each optionally mapped to a
//! category label. This crate provides:
//!
//! - [`Code`] and [`CodingSystem`]: the (code, system) identity of a term
//! - [`Codelist`]: an immutable, de-duplicated set of codes with categories
//! - Composition: [`Codelist::combine`] (union) and
//!   [`Codelist::filter_by_category`] (category subset)
//! - [`load`]: reading a codelist from a delimited file with declared columns
//! - [`CodelistRegistry`]: the named, read-only collection of codelists that
//!   variable definitions refer to
//! - [`CodelistManifest`]: a JSON description of sources and derived lists
//!
//! # Example
//!
//! ```ignore
//! use cohort_codelist::{CodelistRegistry, CodelistSource, CodingSystem};
//!
//! let mut builder = CodelistRegistry::builder();
//! builder.load(
//!     "ethnicity_codes",
//!     &CodelistSource::new("codelists/eth2001.csv", CodingSystem::Snomed, "code")
//!         .with_category_column("grouping_16_id"),
//! )?;
//! let registry = builder.build();
//! ```

pub mod code;
pub mod codelist;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod source;

pub use code::{Code, CodingSystem};
pub use codelist::{Codelist, ConflictPolicy};
pub use error::{CodelistError, CodelistResult};
pub use manifest::{CodelistManifest, DerivedCodelist, SourceEntry};
pub use registry::{CodelistRegistry, CodelistRegistryBuilder};
pub use source::{CodelistSource, load, load_from_reader};
