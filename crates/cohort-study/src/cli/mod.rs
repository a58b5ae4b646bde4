//! Command-line commands
//!
//! - Extraction
//! - Study validation
//! - Codelist inspection
//! - Output formatting

pub mod codelists;
pub mod extract;
pub mod output;
pub mod validate;
