//! Extract command implementation

use super::output;
use crate::config::StudyConfig;
use crate::runner;
use crate::study::StudyVariant;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use cohort_diagnostics::Severity;
use colored::Colorize;
use std::path::PathBuf;

/// Command-line values that replace config file settings
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub config: Option<PathBuf>,
    pub variant: Option<StudyVariant>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_age: Option<i64>,
    pub codelist_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub patients: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
}

impl RunOverrides {
    /// Read the config file if given, then apply every override
    pub fn resolve(self) -> Result<StudyConfig> {
        let mut config = match &self.config {
            Some(path) => StudyConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StudyConfig::default(),
        };

        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(date) = self.start_date {
            config.start_date = date;
        }
        if let Some(date) = self.end_date {
            config.end_date = date;
        }
        if let Some(min_age) = self.min_age {
            config.min_age = min_age;
        }
        if let Some(dir) = self.codelist_dir {
            config.codelist_dir = dir;
        }
        if self.manifest.is_some() {
            config.manifest = self.manifest;
        }
        if let Some(patients) = self.patients {
            config.patients = patients;
        }
        if let Some(path) = self.output {
            config.output = path;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Configuration for extract command
pub struct ExtractConfig {
    pub run: RunOverrides,
    pub verbose: bool,
}

/// Run the study and write the output CSV
pub fn extract(config: ExtractConfig) -> Result<()> {
    let study_config = config.run.resolve()?;
    if config.verbose {
        eprintln!(
            "Extracting {} study from {} into {}",
            study_config.variant.to_string().cyan(),
            study_config.patients.display(),
            study_config.output.display()
        );
    }

    let report = runner::extract(&study_config).context("Extraction failed")?;

    let min = if config.verbose { Severity::Info } else { Severity::Warning };
    output::print_diagnostics(&report.diagnostics, min);
    for failure in &report.failures {
        output::print_diagnostic(&failure.to_diagnostic());
    }

    eprintln!("{}", report.summary);
    if report.failures.is_empty() {
        eprintln!(
            "{}",
            output::format_success(&format!("Output written to {}", report.output.display()))
        );
    } else {
        eprintln!(
            "{}",
            output::format_warning(&format!(
                "{} patient(s) could not be evaluated; output written to {}",
                report.failures.len(),
                report.output.display()
            ))
        );
    }
    Ok(())
}
