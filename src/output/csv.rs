//! CSV report.
//!
//! A title line and a summary block come first, then one row per file:
//!
//! ```text
//! File,Total Lines,Unique Lines,Duplicates Removed,Duplication Rate,Status
//! logs/app.log,200,150,50,25.00%,Success
//! missing.txt,,,,,ERROR: File not found: missing.txt
//! ```

use std::io;

use thiserror::Error;

use super::{format_rate, status_label};
use crate::orchestrator::RunSummary;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

const HEADER: [&str; 6] = [
    "File",
    "Total Lines",
    "Unique Lines",
    "Duplicates Removed",
    "Duplication Rate",
    "Status",
];

/// CSV output formatter.
pub struct CsvOutput<'a> {
    summary: &'a RunSummary,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(summary: &'a RunSummary) -> Self {
        Self { summary }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let summary = self.summary;
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        csv_writer.write_record(["linedupe results"])?;
        csv_writer.write_record([
            "Files processed".to_string(),
            format!("{}/{}", summary.files_processed(), summary.files_total()),
        ])?;
        csv_writer.write_record(["Files failed".to_string(), summary.files_failed().to_string()])?;
        if summary.dry_run {
            csv_writer.write_record(["Dry run", "yes"])?;
        }
        csv_writer.write_record([""])?;
        csv_writer.write_record(HEADER)?;

        for report in &summary.reports {
            let path = report.path.to_string_lossy().into_owned();
            let status = status_label(report, summary.dry_run);
            let record = match report.stats() {
                Some(stats) => [
                    path,
                    stats.total_lines.to_string(),
                    stats.unique_lines.to_string(),
                    stats.duplicates_removed.to_string(),
                    format_rate(stats.duplication_rate()),
                    status,
                ],
                None => [
                    path,
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    status,
                ],
            };
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
