//! CSV output
//!
//! One header row (`patient_id` followed by the output columns) and one row
//! per included patient. Null values are written as empty cells; dates use
//! the column's [`DateFormat`](crate::variable::DateFormat).

use crate::compiled::CompiledStudy;
use crate::engine::OutputRow;
use crate::error::{EvalError, EvalResult};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write rows to any writer
pub fn write_csv<W: Write>(study: &CompiledStudy, rows: &[OutputRow], writer: W) -> EvalResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let columns = study.columns();

    let header = std::iter::once("patient_id").chain(columns.iter().map(|c| c.name.as_str()));
    csv.write_record(header)
        .map_err(|e| EvalError::output(format!("failed to write header: {e}")))?;

    let mut record = Vec::with_capacity(columns.len() + 1);
    for row in rows {
        record.clear();
        record.push(row.patient_id.to_string());
        record.extend(
            columns
                .iter()
                .zip(&row.values)
                .map(|(column, value)| column.render(value)),
        );
        csv.write_record(&record).map_err(|e| {
            EvalError::output(format!("failed to write row for patient {}: {e}", row.patient_id))
        })?;
    }

    csv.flush()
        .map_err(|e| EvalError::output(format!("failed to flush output: {e}")))
}

/// Write rows to a file, replacing it if it exists
pub fn write_csv_file(study: &CompiledStudy, rows: &[OutputRow], path: &Path) -> EvalResult<()> {
    let file = File::create(path)
        .map_err(|e| EvalError::output(format!("cannot create {}: {e}", path.display())))?;
    write_csv(study, rows, file)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
