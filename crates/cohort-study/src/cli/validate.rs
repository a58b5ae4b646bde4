//! Validate command implementation

use super::extract::RunOverrides;
use super::output;
use crate::runner;
use anyhow::{Context, Result};
use cohort_diagnostics::Severity;
use colored::Colorize;

/// Configuration for validate command
pub struct ValidateConfig {
    pub run: RunOverrides,
    /// Treat warnings as errors
    pub strict: bool,
    pub verbose: bool,
}

/// Load the codelists and compile the study without reading patient data
pub fn validate(config: ValidateConfig) -> Result<()> {
    let study_config = config.run.resolve()?;
    let registry = runner::load_registry(&study_config).context("Failed to load codelists")?;

    let study = match runner::compile_study(&study_config, &registry) {
        Ok(study) => study,
        Err(error) => {
            output::print_diagnostic(&error.to_diagnostic());
            anyhow::bail!("The {} study does not compile", study_config.variant);
        }
    };

    let diagnostics = study.diagnostics();
    let min = if config.verbose { Severity::Info } else { Severity::Warning };
    output::print_diagnostics(diagnostics, min);

    if config.verbose {
        eprintln!("Evaluation order: {}", study.evaluation_order().join(", ").dimmed());
    }

    let warnings = diagnostics.count(Severity::Warning);
    if config.strict && warnings > 0 {
        eprintln!("{}", "Strict mode: treating warnings as errors".yellow());
        anyhow::bail!("Validation failed: {}", output::summarize(diagnostics));
    }

    println!(
        "{}",
        output::format_success(&format!(
            "{} study compiles: {} variables, {} output columns ({})",
            study_config.variant,
            study.variable_count(),
            study.columns().len(),
            output::summarize(diagnostics)
        ))
    );
    Ok(())
}
