//! Run configuration
//!
//! A run is configured from a JSON file; every field has a default so a file
//! only names what differs:
//!
//! ```json
//! {
//!   "variant": "main",
//!   "start_date": "2020-12-07",
//!   "end_date": "2021-03-17",
//!   "codelist_dir": "codelists",
//!   "patients": "data/patients.json",
//!   "output": "output/input.csv",
//!   "threads": 8
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use crate::error::{StudyError, StudyResult};
use crate::study::{
    DEFAULT_AGE_REFERENCE_DATE, DEFAULT_END_DATE, DEFAULT_MIN_AGE, DEFAULT_START_DATE,
    StudyVariant, VaccineUptakeStudy,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudyConfig {
    pub variant: StudyVariant,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_age: i64,
    pub age_reference_date: NaiveDate,
    /// Directory holding the codelist CSV files
    pub codelist_dir: PathBuf,
    /// Codelist manifest; the built-in study manifest when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// JSON file with an array of patient records
    pub patients: PathBuf,
    pub output: PathBuf,
    /// Worker threads; all cores when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            variant: StudyVariant::Main,
            start_date: DEFAULT_START_DATE,
            end_date: DEFAULT_END_DATE,
            min_age: DEFAULT_MIN_AGE,
            age_reference_date: DEFAULT_AGE_REFERENCE_DATE,
            codelist_dir: PathBuf::from("codelists"),
            manifest: None,
            patients: PathBuf::from("patients.json"),
            output: PathBuf::from("output/input.csv"),
            threads: None,
        }
    }
}

impl StudyConfig {
    /// Parse a config from JSON text; paths are kept as written
    pub fn from_json(origin: &Path, json: &str) -> StudyResult<Self> {
        serde_json::from_str(json).map_err(|e| StudyError::config(origin, e.to_string()))
    }

    /// Read a config file, resolving its relative paths against its directory
    pub fn from_json_file(path: impl AsRef<Path>) -> StudyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StudyError::config(path, e.to_string()))?;
        let config = Self::from_json(path, &json)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolved_against(base))
    }

    /// Make relative paths relative to `base`
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.codelist_dir);
        resolve(&mut self.patients);
        resolve(&mut self.output);
        if let Some(manifest) = self.manifest.as_mut() {
            resolve(manifest);
        }
        self
    }

    /// Reject parameters no study can run with
    pub fn validate(&self) -> StudyResult<()> {
        let origin = Path::new("<config>");
        if self.end_date < self.start_date {
            return Err(StudyError::config(
                origin,
                format!("end_date {} is before start_date {}", self.end_date, self.start_date),
            ));
        }
        if self.threads == Some(0) {
            return Err(StudyError::config(origin, "threads must be at least 1"));
        }
        if self.min_age < 0 {
            return Err(StudyError::config(origin, "min_age must not be negative"));
        }
        Ok(())
    }

    /// Study parameters of this run
    pub fn study(&self) -> VaccineUptakeStudy {
        VaccineUptakeStudy::new(self.variant)
            .with_start_date(self.start_date)
            .with_end_date(self.end_date)
            .with_min_age(self.min_age)
            .with_age_reference_date(self.age_reference_date)
    }
}
