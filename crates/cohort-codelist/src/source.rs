//! Loading codelists from delimited files

use crate::code::{Code, CodingSystem};
use crate::codelist::{Codelist, insert_entry};
use crate::error::{CodelistError, CodelistResult};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where a codelist comes from and how to read it
///
/// Column names and the coding system are declared here; nothing is inferred
/// from the file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistSource {
    /// Path to the delimited file
    pub path: PathBuf,
    /// Coding system of every code in the file
    pub system: CodingSystem,
    /// Header of the column holding the codes
    pub column: String,
    /// Header of the column holding category labels, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
}

impl CodelistSource {
    pub fn new(path: impl Into<PathBuf>, system: CodingSystem, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            system,
            column: column.into(),
            category_column: None,
        }
    }

    pub fn with_category_column(mut self, column: impl Into<String>) -> Self {
        self.category_column = Some(column.into());
        self
    }

    /// Resolve a relative path against a base directory
    pub fn resolved_against(&self, base: &Path) -> Self {
        let mut source = self.clone();
        if source.path.is_relative() {
            source.path = base.join(&source.path);
        }
        source
    }
}

/// Load a codelist from its source file
pub fn load(name: &str, source: &CodelistSource) -> CodelistResult<Codelist> {
    let path = &source.path;
    if !path.exists() {
        return Err(CodelistError::MissingSource { path: path.clone() });
    }

    let file = File::open(path).map_err(|e| CodelistError::Io {
        path: path.clone(),
        message: e.to_string(),
    })?;

    let codelist = read_entries(name, file, source, &path.display().to_string())?;
    debug!(
        "Loaded codelist {} ({} codes) from {}",
        name,
        codelist.len(),
        path.display()
    );
    Ok(codelist)
}

/// Load a codelist from any reader, using the source's column declarations
///
/// The path in `source` is only used in error messages.
pub fn load_from_reader<R: Read>(
    name: &str,
    reader: R,
    source: &CodelistSource,
) -> CodelistResult<Codelist> {
    read_entries(name, reader, source, &source.path.display().to_string())
}

fn read_entries<R: Read>(
    name: &str,
    reader: R,
    source: &CodelistSource,
    origin: &str,
) -> CodelistResult<Codelist> {
    let csv_error = |e: csv::Error| CodelistError::Csv {
        origin: origin.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let column_index = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| CodelistError::malformed(origin, 1, format!("missing column '{column}'")))
    };
    let code_index = column_index(&source.column)?;
    let category_index = source
        .category_column
        .as_deref()
        .map(column_index)
        .transpose()?;

    let mut entries = IndexMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, |p| p.line());

        let code = record.get(code_index).unwrap_or_default();
        let category = category_index
            .and_then(|i| record.get(i))
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        insert_entry(
            &mut entries,
            origin,
            line,
            Code::new(source.system.clone(), code),
            category,
        )?;
    }

    Ok(Codelist::from_checked(name, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snomed_source() -> CodelistSource {
        CodelistSource::new("eth2001.csv", CodingSystem::Snomed, "code")
            .with_category_column("grouping_16_id")
    }

    #[test]
    fn test_reads_declared_columns() {
        let data = "code,term,grouping_16_id\n976631000000101,Mixed,5\n92491000000104,White,1\n";
        let list = load_from_reader("ethnicity_codes", data.as_bytes(), &snomed_source()).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.category(&Code::snomed("976631000000101")), Some("5"));
        assert_eq!(list.name(), "ethnicity_codes");
    }

    #[test]
    fn test_missing_column() {
        let data = "snomed_id,term\n1,a\n";
        let err = load_from_reader("x", data.as_bytes(), &snomed_source()).unwrap_err();
        assert!(matches!(err, CodelistError::MalformedEntry { line: 1, .. }));
    }

    #[test]
    fn test_empty_code_reports_line() {
        let data = "code,grouping_16_id\n1,5\n,6\n";
        let err = load_from_reader("x", data.as_bytes(), &snomed_source()).unwrap_err();
        assert_eq!(
            err,
            CodelistError::malformed("eth2001.csv", 3, "row has no code")
        );
    }

    #[test]
    fn test_missing_file() {
        let source = CodelistSource::new("/nonexistent/list.csv", CodingSystem::Ctv3, "CTV3ID");
        let err = load("x", &source).unwrap_err();
        assert!(matches!(err, CodelistError::MissingSource { .. }));
    }

    #[test]
    fn test_resolved_against() {
        let source = CodelistSource::new("a.csv", CodingSystem::Ctv3, "CTV3ID");
        let resolved = source.resolved_against(Path::new("/data/codelists"));
        assert_eq!(resolved.path, PathBuf::from("/data/codelists/a.csv"));
    }
}
