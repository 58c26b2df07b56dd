//! Human-readable text report.
//!
//! ```text
//! === linedupe results ===
//! Files processed: 1/2
//! Files failed: 1
//!
//! logs/app.log
//!   Total lines: 200
//!   ...
//! [ERROR] missing.txt: File not found: missing.txt
//! ```

use std::fmt::Write as _;

use yansi::{Paint, Style};

use super::format_rate;
use crate::orchestrator::RunSummary;

const HEADING: Style = Style::new().bold();
const SUCCESS: Style = Style::new().green();
const DRY_RUN: Style = Style::new().yellow();
const ERROR: Style = Style::new().red().bold();

/// Text report formatter.
pub struct TextOutput<'a> {
    summary: &'a RunSummary,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Plain (uncolored) report for `summary`.
    #[must_use]
    pub fn new(summary: &'a RunSummary) -> Self {
        Self {
            summary,
            color: false,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Render the report.
    #[must_use]
    pub fn render(&self) -> String {
        let summary = self.summary;
        let mut out = String::new();

        let _ = writeln!(out, "{}", self.paint("=== linedupe results ===", HEADING));
        if summary.dry_run {
            let _ = writeln!(out, "{}", self.paint("[DRY RUN] No files were modified", DRY_RUN));
        }
        let _ = writeln!(
            out,
            "Files processed: {}/{}",
            summary.files_processed(),
            summary.files_total()
        );
        if summary.files_failed() > 0 {
            let _ = writeln!(
                out,
                "{}",
                self.paint(&format!("Files failed: {}", summary.files_failed()), ERROR)
            );
        }
        if summary.interrupted {
            let _ = writeln!(
                out,
                "{}",
                self.paint(
                    &format!(
                        "Interrupted: {} file(s) left unchanged",
                        summary.files_interrupted()
                    ),
                    DRY_RUN
                )
            );
        }

        for report in &summary.reports {
            let path = report.path.display().to_string();
            match &report.outcome {
                Ok(outcome) => {
                    let stats = &outcome.stats;
                    let _ = writeln!(out);
                    let style = if summary.dry_run { DRY_RUN } else { SUCCESS };
                    let _ = writeln!(out, "{}", self.paint(&path, style));
                    let _ = writeln!(out, "  Total lines: {}", stats.total_lines);
                    let _ = writeln!(out, "  Unique lines: {}", stats.unique_lines);
                    let _ = writeln!(out, "  Duplicates removed: {}", stats.duplicates_removed);
                    let _ = writeln!(
                        out,
                        "  Duplication rate: {}",
                        format_rate(stats.duplication_rate())
                    );
                    if stats.excluded_lines > 0 {
                        let _ = writeln!(out, "  Excluded lines: {}", stats.excluded_lines);
                    }
                    if stats.decode_warnings > 0 {
                        let _ = writeln!(out, "  Decode warnings: {}", stats.decode_warnings);
                    }
                    let _ = writeln!(out, "  Elapsed: {:.3}s", stats.elapsed_seconds());
                    if let Some(backup) = &outcome.backup {
                        let _ = writeln!(out, "  Backup: {}", backup.display());
                    }
                }
                Err(e) => {
                    let _ = writeln!(out);
                    let _ = writeln!(
                        out,
                        "{} {}: {}",
                        self.paint("[ERROR]", ERROR),
                        path,
                        e
                    );
                }
            }
        }

        out
    }
}
