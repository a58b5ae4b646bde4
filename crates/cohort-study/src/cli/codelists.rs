//! Codelists command implementation

use super::extract::RunOverrides;
use crate::runner;
use anyhow::{Context, Result};
use colored::Colorize;

/// Configuration for codelists command
pub struct CodelistsConfig {
    pub run: RunOverrides,
    /// Print the manifest as JSON instead of loading the lists
    pub manifest_only: bool,
}

/// List the codelists of a run with their sizes and categories
pub fn codelists(config: CodelistsConfig) -> Result<()> {
    let study_config = config.run.resolve()?;

    if config.manifest_only {
        let manifest = runner::load_manifest(&study_config)?;
        let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        println!("{json}");
        return Ok(());
    }

    let registry = runner::load_registry(&study_config).context("Failed to load codelists")?;
    for (name, codelist) in registry.iter() {
        let systems: Vec<&str> = codelist.systems().into_iter().map(|s| s.as_str()).collect();
        let mut line = format!(
            "{:<48} {:>6} codes  {}",
            name.bold(),
            codelist.len(),
            systems.join(",").dimmed()
        );
        if codelist.is_categorised() {
            let categories: Vec<&str> = codelist.categories().into_iter().collect();
            line.push_str(&format!("  [{}]", categories.join(", ")));
        }
        println!("{line}");
    }
    println!("{} codelists", registry.len());
    Ok(())
}
