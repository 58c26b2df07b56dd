//! Command-line interface definitions.
//!
//! Every option left unset on the command line falls back to the config
//! file and `LINEDUPE_*` environment variables (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Remove case-insensitive duplicates in place
//! linedupe notes.txt
//!
//! # Near-duplicates, but never touch comment lines
//! linedupe -m fuzzy -s 0.9 -e '^#' config.ini
//!
//! # Preview a whole directory tree in parallel and report as JSON
//! linedupe -r -p -n --report json logs/
//!
//! # Follow a growing log, remembering the last 500 lines
//! linedupe --stream --follow --buffer-size 500 app.log
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::dedup::ComparisonMode;
use crate::output::ReportFormat;

/// Order-preserving duplicate line remover.
///
/// Keeps the first occurrence of every line and removes later duplicates,
/// under one of several comparison modes. Files are rewritten in place
/// unless --dry-run is given; --stream prints kept lines of a growing file.
#[derive(Debug, Parser)]
#[command(name = "linedupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files (or, with --recursive, directories) to process
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Comparison mode: case-insensitive, case-sensitive,
    /// whitespace-insensitive, content-hash, alphanumeric-only, fuzzy
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<ComparisonMode>,

    /// Similarity threshold for fuzzy mode (0.0 to 1.0)
    #[arg(short, long, value_name = "RATIO")]
    pub similarity: Option<f64>,

    /// Never remove lines matching this regular expression
    #[arg(short, long, value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Bytes read per chunk (e.g., 64KiB, 1MB)
    #[arg(long, value_name = "SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<usize>,

    /// Process files concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of worker threads with --parallel
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Report what would be removed without modifying any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Keep a copy of each rewritten file as <path>.bak
    #[arg(short, long)]
    pub backup: bool,

    /// Expand directory arguments to the regular files below them
    #[arg(short, long)]
    pub recursive: bool,

    /// Report format of a batch run
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub report: Option<ReportFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub report_file: Option<PathBuf>,

    /// Show a progress bar over the file list
    #[arg(long)]
    pub progress: bool,

    /// Watch a single file and print kept lines as they appear
    #[arg(long)]
    pub stream: bool,

    /// Keep polling after the end of the file (stream mode)
    #[arg(long, requires = "stream")]
    pub follow: bool,

    /// Seconds between polls (stream mode)
    #[arg(long, value_name = "SECS", requires = "stream")]
    pub poll_interval: Option<f64>,

    /// Number of recent lines remembered (stream mode)
    #[arg(long, value_name = "N", requires = "stream")]
    pub buffer_size: Option<usize>,

    /// Stop watching after this many seconds (stream mode)
    #[arg(long, value_name = "SECS", requires = "stream")]
    pub max_runtime: Option<f64>,

    /// Write kept lines here instead of stdout (stream mode)
    #[arg(short, long, value_name = "PATH", requires = "stream")]
    pub output: Option<PathBuf>,

    /// Load settings from this TOML file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports formats like:
/// - Plain numbers: "1024" (bytes)
/// - With suffix: "1KB", "1K", "1KiB" (kilobytes)
/// - Megabytes: "1MB", "1M", "1MiB"
/// - Gigabytes: "1GB", "1G", "1GiB"
///
/// KB/MB/GB use powers of 1000, KiB/MiB/GiB use powers of 1024.
///
/// # Errors
///
/// Returns an error message for an empty string, a malformed number or an
/// unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// [`parse_size`] for `--chunk-size`, rejecting zero.
fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let bytes = parse_size(s)?;
    if bytes == 0 {
        return Err("Chunk size must be greater than 0".to_string());
    }
    usize::try_from(bytes).map_err(|_| format!("Chunk size too large: '{s}'"))
}
