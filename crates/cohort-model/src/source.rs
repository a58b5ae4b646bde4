//! Patient data sources
//!
//! The evaluator never performs I/O. A [`PatientSource`] hands over every
//! patient history up front; the collaborator database is modelled by the
//! JSON file source, tests use [`InMemorySource`].

use crate::error::{ModelError, ModelResult};
use crate::patient::PatientRecord;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Supplier of patient histories
pub trait PatientSource: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Load every patient record
    ///
    /// Implementations reject duplicate patient ids.
    fn load_patients(&self) -> ModelResult<Vec<PatientRecord>>;
}

/// Records held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    patients: Vec<PatientRecord>,
}

impl InMemorySource {
    pub fn new(patients: Vec<PatientRecord>) -> Self {
        Self { patients }
    }
}

impl PatientSource for InMemorySource {
    fn describe(&self) -> String {
        format!("in-memory ({} patients)", self.patients.len())
    }

    fn load_patients(&self) -> ModelResult<Vec<PatientRecord>> {
        ensure_unique(&self.patients)?;
        Ok(self.patients.clone())
    }
}

/// A JSON file holding an array of patient records
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse records from JSON text
    pub fn parse(origin: &str, json: &str) -> ModelResult<Vec<PatientRecord>> {
        let patients: Vec<PatientRecord> =
            serde_json::from_str(json).map_err(|e| ModelError::json(origin, e.to_string()))?;
        ensure_unique(&patients)?;
        Ok(patients)
    }
}

impl PatientSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_patients(&self) -> ModelResult<Vec<PatientRecord>> {
        debug!("Reading patient data from {}", self.path.display());
        let json = std::fs::read_to_string(&self.path).map_err(|e| ModelError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let patients = Self::parse(&self.describe(), &json)?;
        info!("Loaded {} patients from {}", patients.len(), self.path.display());
        Ok(patients)
    }
}

fn ensure_unique(patients: &[PatientRecord]) -> ModelResult<()> {
    let mut seen = HashSet::with_capacity(patients.len());
    for patient in patients {
        if !seen.insert(patient.patient_id) {
            return Err(ModelError::DuplicatePatient {
                patient_id: patient.patient_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_rejects_duplicates() {
        let source = InMemorySource::new(vec![PatientRecord::new(7), PatientRecord::new(7)]);
        assert_eq!(
            source.load_patients().unwrap_err(),
            ModelError::DuplicatePatient { patient_id: 7 }
        );
    }

    #[test]
    fn test_parse_minimal_record() {
        let patients = JsonFileSource::parse("inline", r#"[{ "patient_id": 1 }]"#).unwrap();
        assert_eq!(patients, vec![PatientRecord::new(1)]);
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = JsonFileSource::parse("patients.json", "[{").unwrap_err();
        assert!(err.to_string().contains("patients.json"));
    }
}
