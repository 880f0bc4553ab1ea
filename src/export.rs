//! # Tabular Export
//!
//! CSV serialization for record batches. Each batch becomes one file with a
//! fixed header row; an empty batch produces no file at all, so a results
//! directory only ever contains artefacts that hold data.

use std::fs::File;
use std::path::Path;

use thiserror::Error;

use crate::records::CsvRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// What the exporter did with one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// File written with this many data rows, header not counted.
    Written(usize),
    /// Batch was empty; the destination file was not created.
    SkippedEmpty,
}

/// Write one batch as UTF-8 CSV: the header row first, then every record in
/// extraction order. Fields containing commas, quotes or newlines are quoted
/// by the writer; nothing is truncated or reordered.
pub fn write_batch<R: CsvRecord>(
    records: &[R],
    headers: &[&str],
    dest: &Path,
) -> Result<ExportOutcome, ExportError> {
    if records.is_empty() {
        return Ok(ExportOutcome::SkippedEmpty);
    }

    let file = File::create(dest)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record.csv_fields())?;
    }
    writer.flush()?;

    Ok(ExportOutcome::Written(records.len()))
}
