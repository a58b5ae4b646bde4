//! Output formatting utilities

use cohort_diagnostics::{Diagnostic, Diagnostics, Severity};
use colored::Colorize;
use std::io::IsTerminal;

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(std::io::stderr().is_terminal()),
    }
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    let mut out = format!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        out.push_str(&format!("\n  {} {cause}", "caused by:".dimmed()));
    }
    out
}

/// Format a warning for display
pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

pub fn print_diagnostic(diagnostic: &Diagnostic) {
    eprintln!("{}", diagnostic.to_colored_string());
}

/// Print diagnostics at or above `min` severity, most severe first
pub fn print_diagnostics(diagnostics: &Diagnostics, min: Severity) {
    let mut shown: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.severity >= min).collect();
    shown.sort_by(|a, b| b.severity.cmp(&a.severity));
    for diagnostic in shown {
        print_diagnostic(diagnostic);
    }
}

/// One-line count such as "2 warning(s), 1 info"
pub fn summarize(diagnostics: &Diagnostics) -> String {
    let mut parts = Vec::new();
    let errors = diagnostics.count(Severity::Error);
    if errors > 0 {
        parts.push(format!("{errors} error(s)").red().to_string());
    }
    let warnings = diagnostics.count(Severity::Warning);
    if warnings > 0 {
        parts.push(format!("{warnings} warning(s)").yellow().to_string());
    }
    let infos = diagnostics.count(Severity::Info);
    if infos > 0 {
        parts.push(format!("{infos} info"));
    }
    if parts.is_empty() {
        "no diagnostics".to_string()
    } else {
        parts.join(", ")
    }
}
