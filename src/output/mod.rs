//! Report formatters for batch run results.
//!
//! This module renders a [`RunSummary`] as:
//! - plain or colored text for the terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//! - Markdown for pasting into documents
//!
//! # Example
//!
//! ```no_run
//! use linedupe::orchestrator::{FileOrchestrator, OrchestratorConfig};
//! use linedupe::output::{render, ReportFormat};
//! use std::path::PathBuf;
//!
//! let orchestrator = FileOrchestrator::new(OrchestratorConfig::default()).unwrap();
//! let summary = orchestrator.run(&[PathBuf::from("notes.txt")]);
//! println!("{}", render(&summary, ReportFormat::Json, false).unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod markdown;
pub mod text;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::orchestrator::{FileReport, RunSummary};

pub use self::csv::{CsvOutput, CsvOutputError};
pub use self::json::{JsonOutput, JsonOutputError};
pub use self::markdown::MarkdownOutput;
pub use self::text::TextOutput;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON document
    Json,
    /// CSV table
    Csv,
    /// Markdown list and table
    Markdown,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Errors while rendering a report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// JSON generation failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV generation failed.
    #[error(transparent)]
    Csv(#[from] CsvOutputError),
}

/// Render `summary` in `format`. `color` only affects the text format.
///
/// # Errors
///
/// Returns a [`ReportError`] if serialization fails.
pub fn render(summary: &RunSummary, format: ReportFormat, color: bool) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(TextOutput::new(summary).with_color(color).render()),
        ReportFormat::Json => Ok(JsonOutput::new(summary).to_json_pretty()?),
        ReportFormat::Csv => Ok(CsvOutput::new(summary).to_string()?),
        ReportFormat::Markdown => Ok(MarkdownOutput::new(summary).render()),
    }
}

/// A rate in `[0, 1]` as a percentage with two decimals.
#[must_use]
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// `Success`, `Dry run` or `ERROR: <message>`.
#[must_use]
pub fn status_label(report: &FileReport, dry_run: bool) -> String {
    match &report.outcome {
        Ok(_) if dry_run => "Dry run".to_string(),
        Ok(_) => "Success".to_string(),
        Err(e) => format!("ERROR: {}", e),
    }
}
