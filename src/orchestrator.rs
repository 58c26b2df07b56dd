//! Batch and stream runs over files.
//!
//! # Overview
//!
//! [`FileOrchestrator::run`] processes each input file with its own
//! [`DedupEngine`]: duplicates are only ever detected within a file. Files
//! are handled one at a time, or spread over a fixed rayon pool in parallel
//! mode; either way the reports come back in input order and a failing file
//! never stops the others.
//!
//! Kept lines are written to a temporary file next to the original, which is
//! persisted over it only once the whole file has been processed. A dry run,
//! an interrupted file, or a file without duplicates leaves the original
//! untouched.
//!
//! [`FileOrchestrator::watch`] follows one growing file and writes every kept
//! line to a sink as soon as it is decided.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::dedup::{ConfigError, DedupEngine, EngineConfig, PatternCache, RunStatistics};
use crate::progress::{ProgressCallback, PHASE_DEDUP};
use crate::reader::{
    ChunkedReader, FileAccessError, Line, StopReason, StreamConfig, StreamWatcher,
    TextEncoding, DEFAULT_CHUNK_SIZE,
};

/// Default number of parallel workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Options for a batch run.
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Engine settings applied to every file
    pub engine: EngineConfig,
    /// Exclusion pattern, compiled once per run
    pub exclude_pattern: Option<String>,
    /// Bytes read per chunk
    pub chunk_size: usize,
    /// Spread files over a worker pool
    pub parallel: bool,
    /// Pool size in parallel mode
    pub workers: usize,
    /// Decide everything, write nothing
    pub dry_run: bool,
    /// Copy each rewritten file to `<path>.bak` first
    pub backup: bool,
    /// Shutdown flag checked before each file and between lines
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Per-file progress
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            exclude_pattern: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel: false,
            workers: DEFAULT_WORKERS,
            dry_run: false,
            backup: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("engine", &self.engine)
            .field("exclude_pattern", &self.exclude_pattern)
            .field("chunk_size", &self.chunk_size)
            .field("parallel", &self.parallel)
            .field("workers", &self.workers)
            .field("dry_run", &self.dry_run)
            .field("backup", &self.backup)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl OrchestratorConfig {
    /// Set the engine settings.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the exclusion pattern.
    #[must_use]
    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_pattern = Some(pattern.into());
        self
    }

    /// Set the chunk size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enable parallel mode with `workers` threads.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool, workers: usize) -> Self {
        self.parallel = parallel;
        self.workers = workers;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable `.bak` backups.
    #[must_use]
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Why one file was not processed.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The file (or its directory) could not be read or written.
    #[error(transparent)]
    Access(#[from] FileAccessError),

    /// A shutdown was requested before the file was finished. The original
    /// is untouched.
    #[error("Interrupted before completion")]
    Interrupted,

    /// The run configuration was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Kept lines could not be written to the output sink.
    #[error("Failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Result of a successfully processed file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Line counters
    pub stats: RunStatistics,
    /// Encoding the file was read and written in
    pub encoding: TextEncoding,
    /// Whether the file was replaced on disk
    pub rewritten: bool,
    /// Backup copy, if one was made
    pub backup: Option<PathBuf>,
}

/// Outcome for one input path.
#[derive(Debug)]
pub struct FileReport {
    /// The input path
    pub path: PathBuf,
    /// Statistics, or why the file failed
    pub outcome: Result<FileOutcome, FileError>,
}

impl FileReport {
    /// Statistics of a processed file.
    #[must_use]
    pub fn stats(&self) -> Option<&RunStatistics> {
        self.outcome.as_ref().ok().map(|o| &o.stats)
    }

    /// Error of a failed file.
    #[must_use]
    pub fn error(&self) -> Option<&FileError> {
        self.outcome.as_ref().err()
    }
}

/// Aggregate of a batch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per distinct input path, in input order
    pub reports: Vec<FileReport>,
    /// Whether nothing was written
    pub dry_run: bool,
    /// Whether a shutdown was requested during the run
    pub interrupted: bool,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of distinct input files.
    #[must_use]
    pub fn files_total(&self) -> usize {
        self.reports.len()
    }

    /// Files processed successfully.
    #[must_use]
    pub fn files_processed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    /// Files that failed, not counting files skipped by a shutdown.
    #[must_use]
    pub fn files_failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, Err(ref e) if !matches!(e, FileError::Interrupted)))
            .count()
    }

    /// Files left unfinished by a shutdown.
    #[must_use]
    pub fn files_interrupted(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, Err(FileError::Interrupted)))
            .count()
    }

    /// Counters summed over all processed files.
    #[must_use]
    pub fn totals(&self) -> RunStatistics {
        let mut totals = RunStatistics::default();
        for stats in self.reports.iter().filter_map(FileReport::stats) {
            totals.accumulate(stats);
        }
        totals
    }

    /// Report for `path`, if it was part of the run.
    #[must_use]
    pub fn report_for(&self, path: &Path) -> Option<&FileReport> {
        self.reports.iter().find(|r| r.path == path)
    }
}

/// Outcome of a stream run.
#[derive(Debug, Clone)]
pub struct StreamReport {
    /// The watched file
    pub path: PathBuf,
    /// Line counters
    pub stats: RunStatistics,
    /// Why the watch ended
    pub stop_reason: StopReason,
    /// Times the file was truncated and re-read
    pub truncations: u64,
}

/// Runs one engine per file.
#[derive(Debug)]
pub struct FileOrchestrator {
    config: OrchestratorConfig,
    patterns: PatternCache,
}

impl FileOrchestrator {
    /// Validate the configuration and compile the exclusion pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for out-of-range values or a pattern that
    /// does not compile, before any file is touched.
    pub fn new(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        config.engine.validate()?;
        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if config.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }

        let patterns = PatternCache::new();
        if let Some(pattern) = &config.exclude_pattern {
            patterns.compile(pattern)?;
        }

        Ok(Self { config, patterns })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Engine settings for one file, with the cached exclusion filter.
    fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut engine = self.config.engine.clone();
        if let Some(pattern) = &self.config.exclude_pattern {
            engine.exclusion = Some(self.patterns.compile(pattern)?);
        }
        Ok(engine)
    }

    /// Process every distinct path in `paths`.
    ///
    /// Repeated paths are processed once. Reports are returned in input
    /// order regardless of completion order.
    pub fn run(&self, paths: &[PathBuf]) -> RunSummary {
        let started = Instant::now();

        let mut seen = HashSet::new();
        let files: Vec<&PathBuf> = paths.iter().filter(|p| seen.insert(*p)).collect();
        if files.len() < paths.len() {
            log::debug!("Ignoring {} repeated path(s)", paths.len() - files.len());
        }

        log::info!(
            "Processing {} file(s) ({}, mode: {})",
            files.len(),
            if self.config.parallel {
                format!("parallel, {} workers", self.config.workers)
            } else {
                "sequential".to_string()
            },
            self.config.engine.mode
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_start(PHASE_DEDUP, files.len());
        }

        let completed = AtomicUsize::new(0);
        let reports: Vec<FileReport> = if self.config.parallel && files.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    files
                        .par_iter()
                        .map(|path| self.handle(path, &completed))
                        .collect()
                }),
                Err(e) => {
                    log::warn!("Failed to create worker pool ({}), processing sequentially", e);
                    files.iter().map(|path| self.handle(path, &completed)).collect()
                }
            }
        } else {
            files.iter().map(|path| self.handle(path, &completed)).collect()
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_end(PHASE_DEDUP);
        }

        let summary = RunSummary {
            reports,
            dry_run: self.config.dry_run,
            interrupted: self.is_shutdown_requested(),
            elapsed: started.elapsed(),
        };
        log::info!(
            "Finished: {}/{} file(s) processed, {} failed",
            summary.files_processed(),
            summary.files_total(),
            summary.files_failed()
        );
        summary
    }

    fn handle(&self, path: &Path, completed: &AtomicUsize) -> FileReport {
        let outcome = if self.is_shutdown_requested() {
            Err(FileError::Interrupted)
        } else {
            self.process_file(path)
        };

        match &outcome {
            Ok(result) => log::info!(
                "{}: {} lines, {} duplicates removed{}",
                path.display(),
                result.stats.total_lines,
                result.stats.duplicates_removed,
                if self.config.dry_run { " (dry run)" } else { "" }
            ),
            Err(FileError::Interrupted) => log::debug!("{}: skipped by shutdown", path.display()),
            Err(e) => log::warn!("{}: {}", path.display(), e),
        }

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_progress(done, &path.to_string_lossy());
        }

        FileReport {
            path: path.to_path_buf(),
            outcome,
        }
    }

    /// Deduplicate a single file.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be read or replaced, or if
    /// a shutdown is requested before it is finished. The original file is
    /// unchanged in every error case.
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome, FileError> {
        let mut reader = ChunkedReader::open(path, self.config.chunk_size)?;
        let encoding = reader.encoding();
        let mut engine = DedupEngine::new(self.engine_config()?)?;

        let mut sink = if self.config.dry_run {
            None
        } else {
            Some(RewriteSink::create(path, encoding)?)
        };

        for line in reader.by_ref() {
            if self.is_shutdown_requested() {
                return Err(FileError::Interrupted);
            }
            let line = line?;
            if engine.classify(&line.text).is_kept() {
                if let Some(ref mut sink) = sink {
                    sink.write_line(&line)?;
                }
            }
        }

        let mut stats = engine.finalize();
        stats.decode_warnings = reader.decode_warnings();
        if stats.decode_warnings > 0 {
            log::warn!(
                "{}: replaced undecodable bytes in {} line(s)",
                path.display(),
                stats.decode_warnings
            );
        }

        let mut outcome = FileOutcome {
            stats,
            encoding,
            rewritten: false,
            backup: None,
        };

        let Some(sink) = sink else {
            return Ok(outcome);
        };
        if outcome.stats.duplicates_removed == 0 {
            log::debug!("{}: no duplicates, leaving file unchanged", path.display());
            return Ok(outcome);
        }

        if self.config.backup {
            let backup = backup_path(path);
            fs::copy(path, &backup).map_err(|e| FileAccessError::from_io(&backup, e))?;
            log::debug!("Backed up {} to {}", path.display(), backup.display());
            outcome.backup = Some(backup);
        }

        sink.commit()?;
        outcome.rewritten = true;
        Ok(outcome)
    }

    /// Follow `path` and write each kept line to `out` as soon as it is decided.
    ///
    /// The engine remembers only the `buffer_size` most recent keys, so a
    /// repeat of an older line is kept again.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the stream configuration is invalid, the
    /// file becomes unreadable, or `out` cannot be written.
    pub fn watch<W: Write>(
        &self,
        path: &Path,
        stream: &StreamConfig,
        out: &mut W,
    ) -> Result<StreamReport, FileError> {
        stream.validate()?;
        let engine_config = self.engine_config()?.with_window(stream.buffer_size);
        let mut engine = DedupEngine::new(engine_config)?;

        let shutdown = self.config.shutdown_flag.clone().unwrap_or_default();
        let mut watcher = StreamWatcher::new(path, stream.clone(), shutdown)?;

        while let Some(line) = watcher.next_line()? {
            if engine.classify(&line.text).is_kept() {
                writeln!(out, "{}", line.text).map_err(FileError::Output)?;
            }
            if !watcher.has_pending() {
                out.flush().map_err(FileError::Output)?;
            }
        }
        out.flush().map_err(FileError::Output)?;

        let mut stats = engine.finalize();
        stats.decode_warnings = watcher.decode_warnings();

        Ok(StreamReport {
            path: path.to_path_buf(),
            stats,
            stop_reason: watcher.stop_reason().unwrap_or(StopReason::EndOfFile),
            truncations: watcher.truncations(),
        })
    }
}

/// `<path>.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Temporary file next to the target that replaces it on commit.
///
/// A symlinked target is resolved first, so the link survives and the file
/// it points to is the one replaced.
struct RewriteSink {
    target: PathBuf,
    writer: BufWriter<tempfile::NamedTempFile>,
    encoding: TextEncoding,
    buffer: Vec<u8>,
}

impl RewriteSink {
    fn create(path: &Path, encoding: TextEncoding) -> Result<Self, FileAccessError> {
        let target = fs::canonicalize(path).map_err(|e| FileAccessError::from_io(path, e))?;
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".linedupe-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| FileAccessError::from_io(dir, e))?;

        let mut writer = BufWriter::new(temp);
        writer
            .write_all(encoding.bom())
            .map_err(|e| FileAccessError::from_io(&target, e))?;

        Ok(Self {
            target,
            writer,
            encoding,
            buffer: Vec::new(),
        })
    }

    fn write_line(&mut self, line: &Line) -> Result<(), FileAccessError> {
        self.buffer.clear();
        self.encoding.encode_into(&line.text, &mut self.buffer);
        self.buffer.extend_from_slice(line.ending.as_bytes());
        self.writer
            .write_all(&self.buffer)
            .map_err(|e| FileAccessError::from_io(&self.target, e))
    }

    /// Flush, copy the original's permissions and atomically replace it.
    fn commit(self) -> Result<(), FileAccessError> {
        let target = self.target;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| FileAccessError::from_io(&target, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| FileAccessError::from_io(&target, e))?;

        let permissions = fs::metadata(&target)
            .map_err(|e| FileAccessError::from_io(&target, e))?
            .permissions();
        fs::set_permissions(temp.path(), permissions)
            .map_err(|e| FileAccessError::from_io(&target, e))?;

        temp.persist(&target)
            .map_err(|e| FileAccessError::from_io(&target, e.error))?;
        log::debug!("Rewrote {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::ComparisonMode;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn orchestrator(config: OrchestratorConfig) -> FileOrchestrator {
        FileOrchestrator::new(config).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            FileOrchestrator::new(OrchestratorConfig::default().with_chunk_size(0)),
            Err(ConfigError::InvalidChunkSize)
        ));
        assert!(matches!(
            FileOrchestrator::new(OrchestratorConfig::default().with_parallel(true, 0)),
            Err(ConfigError::InvalidWorkers)
        ));
        assert!(matches!(
            FileOrchestrator::new(OrchestratorConfig::default().with_exclude_pattern("(")),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            FileOrchestrator::new(
                OrchestratorConfig::default()
                    .with_engine(EngineConfig::default().with_similarity(2.0))
            ),
            Err(ConfigError::InvalidSimilarity(_))
        ));
    }

    #[test]
    fn test_process_file_rewrites_in_place() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "a.txt", "Foo\nbar\nfoo\nBAR\nbaz\n");

        let outcome = orchestrator(OrchestratorConfig::default())
            .process_file(&path)
            .unwrap();
        assert!(outcome.rewritten);
        assert_eq!(outcome.stats.duplicates_removed, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Foo\nbar\nbaz\n");
    }

    #[test]
    fn test_line_endings_and_bom_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.txt");
        fs::write(&path, b"\xEF\xBB\xBFa\r\nb\r\na\r\nlast").unwrap();

        orchestrator(OrchestratorConfig::default())
            .process_file(&path)
            .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFa\r\nb\r\nlast");
    }

    #[test]
    fn test_latin1_file_written_back_as_latin1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.txt");
        fs::write(&path, b"caf\xE9\nCAF\xC9\nth\xC3\xA9\n").unwrap();

        let outcome = orchestrator(OrchestratorConfig::default())
            .process_file(&path)
            .unwrap();
        assert_eq!(outcome.encoding, TextEncoding::Latin1);
        assert_eq!(fs::read(&path).unwrap(), b"caf\xE9\nth\xC3\xA9\n");
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let content = "x\nx\ny\n";
        let path = create_test_file(&dir, "dry.txt", content);

        let config = OrchestratorConfig::default().with_dry_run(true);
        let outcome = orchestrator(config).process_file(&path).unwrap();
        assert!(!outcome.rewritten);
        assert_eq!(outcome.stats.duplicates_removed, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_unchanged_file_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "unique.txt", "a\nb\nc\n");
        let outcome = orchestrator(OrchestratorConfig::default().with_backup(true))
            .process_file(&path)
            .unwrap();
        assert!(!outcome.rewritten);
        assert!(outcome.backup.is_none());
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_backup_created() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "b.txt", "1\n1\n2\n");

        let outcome = orchestrator(OrchestratorConfig::default().with_backup(true))
            .process_file(&path)
            .unwrap();
        let backup = outcome.backup.unwrap();
        assert_eq!(backup, dir.path().join("b.txt.bak"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "1\n1\n2\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\n2\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_target_rewritten_through_link() {
        let dir = TempDir::new().unwrap();
        let real = create_test_file(&dir, "real.txt", "a\na\nb\n");
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let outcome = orchestrator(OrchestratorConfig::default())
            .process_file(&link)
            .unwrap();
        assert!(outcome.rewritten);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), real);
        assert_eq!(fs::read_to_string(&real).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "t.txt", "q\nq\n");
        orchestrator(OrchestratorConfig::default()).run(&[dir.path().join("t.txt")]);

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["t.txt"]);
    }

    #[test]
    fn test_run_partial_failure() {
        let dir = TempDir::new().unwrap();
        let good = create_test_file(&dir, "good.txt", "a\na\n");
        let missing = dir.path().join("missing.txt");

        let summary = orchestrator(OrchestratorConfig::default()).run(&[missing.clone(), good.clone()]);
        assert_eq!(summary.files_total(), 2);
        assert_eq!(summary.files_processed(), 1);
        assert_eq!(summary.files_failed(), 1);
        assert!(matches!(
            summary.report_for(&missing).unwrap().error(),
            Some(FileError::Access(FileAccessError::NotFound(_)))
        ));
        assert_eq!(summary.reports[1].path, good);
        assert_eq!(summary.totals().duplicates_removed, 1);
    }

    #[test]
    fn test_run_ignores_repeated_paths() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "r.txt", "a\na\n");
        let summary = orchestrator(OrchestratorConfig::default().with_dry_run(true))
            .run(&[path.clone(), path.clone()]);
        assert_eq!(summary.files_total(), 1);
    }

    #[test]
    fn test_duplicates_are_per_file() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.txt", "shared\nonly a\n");
        let b = create_test_file(&dir, "b.txt", "shared\nonly b\n");

        let summary = orchestrator(OrchestratorConfig::default()).run(&[a, b]);
        assert_eq!(summary.totals().duplicates_removed, 0);
    }

    #[test]
    fn test_shutdown_before_run_interrupts_all_files() {
        let dir = TempDir::new().unwrap();
        let content = "z\nz\n";
        let path = create_test_file(&dir, "s.txt", content);

        let flag = Arc::new(AtomicBool::new(true));
        let config = OrchestratorConfig::default().with_shutdown_flag(flag);
        let summary = orchestrator(config).run(&[path.clone()]);

        assert!(summary.interrupted);
        assert_eq!(summary.files_interrupted(), 1);
        assert_eq!(summary.files_failed(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_phase_start(&self, phase: &str, total: usize) {
            self.events.lock().unwrap().push(format!("start {phase} {total}"));
        }
        fn on_progress(&self, current: usize, _path: &str) {
            self.events.lock().unwrap().push(format!("progress {current}"));
        }
        fn on_phase_end(&self, phase: &str) {
            self.events.lock().unwrap().push(format!("end {phase}"));
        }
    }

    #[test]
    fn test_progress_callback_invoked() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.txt", "1\n");
        let b = create_test_file(&dir, "b.txt", "2\n");

        let progress = Arc::new(RecordingProgress::default());
        let config = OrchestratorConfig::default().with_progress_callback(progress.clone());
        orchestrator(config).run(&[a, b]);

        let events = progress.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start dedup 2", "progress 1", "progress 2", "end dedup"]
        );
    }

    #[test]
    fn test_exclusion_pattern_applied() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "e.txt", "# header\n# header\nrow\nrow\n");

        let config = OrchestratorConfig::default()
            .with_engine(EngineConfig::new(ComparisonMode::CaseSensitive))
            .with_exclude_pattern("^#");
        let outcome = orchestrator(config).process_file(&path).unwrap();
        assert_eq!(outcome.stats.excluded_lines, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# header\n# header\nrow\n"
        );
    }

    #[test]
    fn test_watch_writes_kept_lines() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "s.log", "A\nB\nC\nA\nC\n");

        let stream = StreamConfig::default().with_buffer_size(2);
        let mut out = Vec::new();
        let report = orchestrator(OrchestratorConfig::default())
            .watch(&path, &stream, &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "A\nB\nC\nA\n");
        assert_eq!(report.stop_reason, StopReason::EndOfFile);
        assert_eq!(report.stats.total_lines, 5);
        assert_eq!(report.stats.duplicates_removed, 1);
    }

    #[test]
    fn test_watch_rejects_zero_buffer() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(&dir, "s.log", "A\n");
        let stream = StreamConfig::default().with_buffer_size(0);
        let result = orchestrator(OrchestratorConfig::default()).watch(&path, &stream, &mut Vec::new());
        assert!(matches!(result, Err(FileError::Config(ConfigError::InvalidBufferSize))));
    }
}
