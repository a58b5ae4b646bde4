//! End-to-end study runs
//!
//! A run loads the codelists, compiles the study against them, reads the
//! patient data, evaluates every patient and writes the output CSV.

use crate::codelists::study_manifest;
use crate::config::StudyConfig;
use crate::error::StudyResult;
use cohort_codelist::{CodelistManifest, CodelistRegistry};
use cohort_diagnostics::Diagnostics;
use cohort_eval::{
    CohortEngine, CompiledStudy, EvalError, EvaluationSummary, PatientFailure, compile,
    write_csv_file,
};
use cohort_model::{JsonFileSource, PatientSource};
use log::{debug, info};
use std::path::PathBuf;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub summary: EvaluationSummary,
    /// Compile-time warnings and notes
    pub diagnostics: Diagnostics,
    /// Patients that could not be evaluated
    pub failures: Vec<PatientFailure>,
    pub output: PathBuf,
}

/// Load the manifest named by the config, or the built-in one
pub fn load_manifest(config: &StudyConfig) -> StudyResult<CodelistManifest> {
    match &config.manifest {
        Some(path) => {
            debug!("Reading codelist manifest {}", path.display());
            Ok(CodelistManifest::from_json_file(path)?)
        }
        None => Ok(study_manifest()),
    }
}

/// Load every codelist of the run
pub fn load_registry(config: &StudyConfig) -> StudyResult<CodelistRegistry> {
    let manifest = load_manifest(config)?;
    info!(
        "Loading {} codelists from {}",
        manifest.sources.len(),
        config.codelist_dir.display()
    );
    Ok(manifest.build_registry(&config.codelist_dir)?)
}

/// Compile the configured study variant
pub fn compile_study(config: &StudyConfig, registry: &CodelistRegistry) -> StudyResult<CompiledStudy> {
    config.validate()?;
    let definition = config.study().definition();
    let study = compile(&definition, registry)?;
    info!(
        "Compiled {} study: {} variables, {} output columns",
        config.variant,
        study.variable_count(),
        study.columns().len()
    );
    Ok(study)
}

/// Run the whole extraction and write the output file
pub fn extract(config: &StudyConfig) -> StudyResult<ExtractReport> {
    let registry = load_registry(config)?;
    let study = compile_study(config, &registry)?;
    let diagnostics = study.diagnostics().clone();

    let source = JsonFileSource::new(&config.patients);
    let patients = source.load_patients()?;

    let engine = CohortEngine::new(study);
    let result = match config.threads {
        Some(threads) => engine.evaluate_batch_with_threads(&patients, threads)?,
        None => engine.evaluate_batch(&patients),
    };

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| EvalError::output(format!("{}: {e}", parent.display())))?;
    }
    write_csv_file(engine.study(), &result.rows, &config.output)?;

    Ok(ExtractReport {
        summary: result.summary,
        diagnostics,
        failures: result.failures,
        output: config.output.clone(),
    })
}
