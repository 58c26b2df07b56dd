//! Markdown report: a summary list followed by a per-file table.

use std::fmt::Write as _;

use super::{format_rate, status_label};
use crate::orchestrator::RunSummary;

/// Markdown output formatter.
pub struct MarkdownOutput<'a> {
    summary: &'a RunSummary,
}

impl<'a> MarkdownOutput<'a> {
    /// Create a new Markdown output formatter.
    #[must_use]
    pub fn new(summary: &'a RunSummary) -> Self {
        Self { summary }
    }

    /// Render the report.
    #[must_use]
    pub fn render(&self) -> String {
        let summary = self.summary;
        let totals = summary.totals();
        let mut out = String::new();

        let _ = writeln!(out, "# linedupe results\n");
        let _ = writeln!(
            out,
            "- **Files processed:** {}/{}",
            summary.files_processed(),
            summary.files_total()
        );
        let _ = writeln!(out, "- **Files failed:** {}", summary.files_failed());
        let _ = writeln!(out, "- **Total lines:** {}", totals.total_lines);
        let _ = writeln!(out, "- **Duplicates removed:** {}", totals.duplicates_removed);
        if summary.dry_run {
            let _ = writeln!(out, "- **Dry run:** no files were modified");
        }
        if summary.interrupted {
            let _ = writeln!(out, "- **Interrupted:** yes");
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| File | Total Lines | Unique Lines | Duplicates Removed | Duplication Rate | Status |"
        );
        let _ = writeln!(out, "|---|---:|---:|---:|---:|---|");
        for report in &summary.reports {
            let path = escape_cell(&report.path.display().to_string());
            let status = escape_cell(&status_label(report, summary.dry_run));
            match report.stats() {
                Some(stats) => {
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} | {} | {} | {} |",
                        path,
                        stats.total_lines,
                        stats.unique_lines,
                        stats.duplicates_removed,
                        format_rate(stats.duplication_rate()),
                        status
                    );
                }
                None => {
                    let _ = writeln!(out, "| {} | | | | | {} |", path, status);
                }
            }
        }

        out
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
