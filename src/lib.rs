//! linedupe - order-preserving duplicate line remover
//!
//! Removes repeated lines from text files while keeping the first occurrence
//! of each line in place. Lines are compared under a [`ComparisonMode`]
//! (exact, case-insensitive, whitespace-insensitive, token multiset,
//! alphanumeric-only, or fuzzy similarity). Lines matching an exclusion
//! pattern are never removed.
//!
//! Files are read in fixed-size chunks so memory stays bounded by the set
//! of distinct keys, not the file size. Batch runs rewrite files atomically
//! (optionally in parallel); stream mode follows a growing file and emits
//! kept lines as they arrive, remembering only a bounded window of keys.
//!
//! [`ComparisonMode`]: dedup::ComparisonMode

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod reader;
pub mod signal;

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use walkdir::WalkDir;

use crate::cli::Cli;
use crate::config::Config;
use crate::dedup::ConfigError;
use crate::error::ExitCode;
use crate::orchestrator::{FileOrchestrator, RunSummary, StreamReport};
use crate::progress::Progress;
use crate::signal::install_handler;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for a rejected configuration, an unreadable stream
/// source, or a report that cannot be written. Per-file failures of a
/// batch run are not errors; they show up in the report and the exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    config.validate()?;
    if log::log_enabled!(log::Level::Debug) {
        if let Ok(toml) = config.to_toml() {
            log::debug!("Effective configuration:\n{}", toml.trim_end());
        }
    }

    let handler = install_handler();
    let orchestrator_config = config
        .orchestrator_config()
        .with_shutdown_flag(handler.get_flag());

    if cli.stream {
        if cli.paths.len() != 1 {
            return Err(ConfigError::StreamPathCount(cli.paths.len()).into());
        }
        let orchestrator = FileOrchestrator::new(orchestrator_config)?;
        let report = run_stream(&orchestrator, &config, &cli.paths[0], cli.output.as_deref())?;
        log::info!(
            "Stopped watching {} ({}): {} lines read, {} duplicates removed",
            report.path.display(),
            report.stop_reason,
            report.stats.total_lines,
            report.stats.duplicates_removed
        );
        return Ok(ExitCode::Success);
    }

    let mut orchestrator_config = orchestrator_config;
    if cli.progress && !cli.quiet {
        orchestrator_config = orchestrator_config.with_progress_callback(Arc::new(Progress::new(false)));
    }
    let orchestrator = FileOrchestrator::new(orchestrator_config)?;

    let paths = expand_paths(&cli.paths, cli.recursive);
    log::debug!("Processing {} file(s)", paths.len());
    let summary = orchestrator.run(&paths);

    let color = config.color && cli.report_file.is_none() && io::stdout().is_terminal();
    let report = output::render(&summary, config.report, color)?;
    match &cli.report_file {
        Some(path) => std::fs::write(path, &report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(report.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(exit_code_for(&summary))
}

fn run_stream(
    orchestrator: &FileOrchestrator,
    config: &Config,
    path: &Path,
    output: Option<&Path>,
) -> anyhow::Result<StreamReport> {
    let stream = config.stream_config()?;
    let report = match output {
        Some(out_path) => {
            let file = File::create(out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            let mut writer = BufWriter::new(file);
            orchestrator.watch(path, &stream, &mut writer)?
        }
        None => {
            let mut stdout = io::stdout().lock();
            orchestrator.watch(path, &stream, &mut stdout)?
        }
    };
    Ok(report)
}

/// Exit code of a finished batch run.
///
/// Interrupted runs exit 130; a run where every file failed is a general
/// error, one where only some failed is a partial success.
#[must_use]
pub fn exit_code_for(summary: &RunSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::Interrupted
    } else if summary.files_failed() == 0 {
        ExitCode::Success
    } else if summary.files_processed() == 0 {
        ExitCode::GeneralError
    } else {
        ExitCode::PartialSuccess
    }
}

/// Replace directory arguments by the regular files below them when
/// `recursive` is set, sorted by path. Other arguments pass through, so a
/// directory without `--recursive` is reported as not a regular file.
#[must_use]
pub fn expand_paths(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut expanded = Vec::with_capacity(paths.len());
    for path in paths {
        if !(recursive && path.is_dir()) {
            expanded.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    expanded.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable entry under {}: {}", path.display(), e),
            }
        }
    }
    expanded
}
