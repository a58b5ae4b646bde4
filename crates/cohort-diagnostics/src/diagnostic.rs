//! Diagnostic records

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Hint - suggestion for improvement
    Hint,
    /// Information - informational message
    Info,
    /// Warning - potential issue but can continue
    Warning,
    /// Error - the study cannot be evaluated
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// A diagnostic message attached to a variable, codelist or patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Name of the variable, codelist or patient the message is about
    pub subject: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Create a new informational diagnostic
    pub fn info(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, message)
    }

    fn with_severity(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            subject: None,
            help: None,
        }
    }

    /// Set the subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Help text, falling back to the registered help for the code
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref().or(self.code.info().help)
    }

    /// Render with terminal colours
    #[cfg(feature = "colored")]
    pub fn to_colored_string(&self) -> String {
        use colored::Colorize;

        let severity = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Info => self.severity.to_string().blue().bold(),
            Severity::Hint => self.severity.to_string().cyan(),
        };
        let mut out = format!("{severity}[{}]: {}", self.code, self.message);
        if let Some(subject) = &self.subject {
            out.push_str(&format!(" ({})", subject.cyan()));
        }
        if let Some(help) = self.help_text() {
            out.push_str(&format!("\n  {} {help}", "help:".green()));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({})", subject)?;
        }
        Ok(())
    }
}

/// An ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    /// True if any diagnostic has error severity
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics at a given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COH0100, COH0107};

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(COH0100, "Ambiguous event selection")
            .with_subject("sev_obesity");

        let text = diag.to_string();
        assert!(text.contains("COH0100"));
        assert!(text.contains("sev_obesity"));
    }

    #[test]
    fn test_help_falls_back_to_code_info() {
        let diag = Diagnostic::error(COH0100, "no selection policy");
        assert_eq!(
            diag.help_text(),
            Some("Set find_first_match_in_period or find_last_match_in_period")
        );

        let diag = diag.with_help("custom");
        assert_eq!(diag.help_text(), Some("custom"));
    }

    #[test]
    fn test_collection_counts() {
        let diags: Diagnostics = vec![
            Diagnostic::warning(COH0107, "unused"),
            Diagnostic::warning(COH0107, "unused"),
            Diagnostic::info(COH0107, "note"),
        ]
        .into_iter()
        .collect();

        assert!(!diags.has_errors());
        assert_eq!(diags.count(Severity::Warning), 2);
        assert_eq!(diags.len(), 3);
    }
}
