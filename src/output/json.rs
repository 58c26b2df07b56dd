//! JSON report.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "timestamp": "2024-05-01T12:00:00+00:00",
//!   "summary": {
//!     "files_total": 2,
//!     "files_processed": 1,
//!     "files_failed": 1,
//!     "total_lines": 200,
//!     "duplicates_removed": 50,
//!     "dry_run": false,
//!     "interrupted": false,
//!     "elapsed_seconds": 0.02
//!   },
//!   "results": [
//!     { "file": "logs/app.log", "status": "success", "total_lines": 200, ... },
//!     { "file": "missing.txt", "status": "error", "error": "File not found: missing.txt" }
//!   ]
//! }
//! ```

use std::io::Write;

use chrono::Local;
use serde::Serialize;

use crate::orchestrator::{FileReport, RunSummary};

/// Summary block of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Distinct input files
    pub files_total: usize,
    /// Files processed successfully
    pub files_processed: usize,
    /// Files that failed
    pub files_failed: usize,
    /// Lines read across processed files
    pub total_lines: u64,
    /// Lines removed across processed files
    pub duplicates_removed: u64,
    /// Whether nothing was written
    pub dry_run: bool,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// Wall-clock time of the run
    pub elapsed_seconds: f64,
}

/// One file in the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFileResult {
    /// Input path
    pub file: String,
    /// `success`, `dry_run` or `error`
    pub status: &'static str,
    /// Lines read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<u64>,
    /// Lines kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_lines: Option<u64>,
    /// Lines removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_removed: Option<u64>,
    /// Lines protected by the exclusion pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_lines: Option<u64>,
    /// Removed fraction of all lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplication_rate: Option<f64>,
    /// Processing time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    /// Detected encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
    /// Error message of a failed file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonFileResult {
    fn from_report(report: &FileReport, dry_run: bool) -> Self {
        let file = report.path.to_string_lossy().into_owned();
        match &report.outcome {
            Ok(outcome) => {
                let stats = &outcome.stats;
                Self {
                    file,
                    status: if dry_run { "dry_run" } else { "success" },
                    total_lines: Some(stats.total_lines),
                    unique_lines: Some(stats.unique_lines),
                    duplicates_removed: Some(stats.duplicates_removed),
                    excluded_lines: Some(stats.excluded_lines),
                    duplication_rate: Some(stats.duplication_rate()),
                    elapsed_seconds: Some(stats.elapsed_seconds()),
                    encoding: Some(outcome.encoding.name()),
                    error: None,
                }
            }
            Err(e) => Self {
                file,
                status: "error",
                total_lines: None,
                unique_lines: None,
                duplicates_removed: None,
                excluded_lines: None,
                duplication_rate: None,
                elapsed_seconds: None,
                encoding: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Report creation time (RFC 3339)
    pub timestamp: String,
    /// Aggregate counters
    pub summary: JsonSummary,
    /// Per-file results in input order
    pub results: Vec<JsonFileResult>,
}

impl JsonOutput {
    /// Build the report for `summary`, stamped with the current local time.
    #[must_use]
    pub fn new(summary: &RunSummary) -> Self {
        let totals = summary.totals();
        Self {
            timestamp: Local::now().to_rfc3339(),
            summary: JsonSummary {
                files_total: summary.files_total(),
                files_processed: summary.files_processed(),
                files_failed: summary.files_failed(),
                total_lines: totals.total_lines,
                duplicates_removed: totals.duplicates_removed,
                dry_run: summary.dry_run,
                interrupted: summary.interrupted,
                elapsed_seconds: summary.elapsed.as_secs_f64(),
            },
            results: summary
                .reports
                .iter()
                .map(|r| JsonFileResult::from_report(r, summary.dry_run))
                .collect(),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
