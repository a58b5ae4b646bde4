//! JSON manifest describing a study's codelists
//!
//! ```json
//! {
//!   "sources": [
//!     { "name": "ethnicity_codes", "path": "primis-covid19-vacc-uptake-eth2001.csv",
//!       "system": "snomed", "column": "code", "category_column": "grouping_16_id" }
//!   ],
//!   "derived": [
//!     { "kind": "combine", "name": "prior_covid_codes",
//!       "from": ["covid_primary_care_code", "covid_primary_care_positive_test"] },
//!     { "kind": "filter", "name": "ever_smoked_codes",
//!       "from": "clear_smoking_codes", "categories": ["S", "E"] },
//!     { "kind": "alias", "name": "high_risk_codes", "of": "shielding_codes" }
//!   ]
//! }
//! ```
//!
//! Derived lists are applied in order after all sources are loaded, so a
//! derived list may build on an earlier one.

use crate::codelist::ConflictPolicy;
use crate::error::{CodelistError, CodelistResult};
use crate::registry::{CodelistRegistry, CodelistRegistryBuilder};
use crate::source::CodelistSource;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named codelist source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    #[serde(flatten)]
    pub source: CodelistSource,
}

/// A codelist derived from registered ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedCodelist {
    Combine {
        name: String,
        from: Vec<String>,
        #[serde(default)]
        on_conflict: ConflictPolicy,
    },
    Filter {
        name: String,
        from: String,
        categories: Vec<String>,
    },
    Alias {
        name: String,
        of: String,
    },
}

impl DerivedCodelist {
    /// Register this list with a builder holding its inputs
    pub fn apply(&self, builder: &mut CodelistRegistryBuilder) -> CodelistResult<()> {
        match self {
            Self::Combine {
                name,
                from,
                on_conflict,
            } => {
                let inputs: Vec<&str> = from.iter().map(String::as_str).collect();
                builder.combine_with(name, &inputs, *on_conflict)?;
            }
            Self::Filter {
                name,
                from,
                categories,
            } => {
                let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
                builder.filter(name, from, &categories)?;
            }
            Self::Alias { name, of } => {
                builder.alias(name, of)?;
            }
        }
        Ok(())
    }
}

/// All codelists of a study
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistManifest {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub derived: Vec<DerivedCodelist>,
}

impl CodelistManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(json: &str) -> CodelistResult<Self> {
        serde_json::from_str(json).map_err(|e| CodelistError::Manifest {
            message: e.to_string(),
        })
    }

    /// Read and parse a manifest file
    pub fn from_json_file(path: impl AsRef<Path>) -> CodelistResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CodelistError::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path).map_err(|e| CodelistError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Load every source (relative paths resolved against `base_dir`) and
    /// apply the derived lists
    pub fn build_registry(&self, base_dir: &Path) -> CodelistResult<CodelistRegistry> {
        let mut builder = CodelistRegistry::builder();
        for entry in &self.sources {
            builder.load(&entry.name, &entry.source.resolved_against(base_dir))?;
        }
        for derived in &self.derived {
            derived.apply(&mut builder)?;
        }

        let registry = builder.build();
        info!(
            "Codelist registry ready: {} lists ({} loaded, {} derived)",
            registry.len(),
            self.sources.len(),
            self.derived.len()
        );
        Ok(registry)
    }
}
