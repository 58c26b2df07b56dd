//! Layered configuration.
//!
//! Values are merged in increasing priority:
//!
//! 1. built-in defaults
//! 2. the TOML config file (`--config PATH`, or `config.toml` in the
//!    platform config directory)
//! 3. `LINEDUPE_*` environment variables (`__` separates nested keys, e.g.
//!    `LINEDUPE_STREAM__BUFFER_SIZE=500`)
//! 4. command-line flags, applied by [`Config::apply_cli`]
//!
//! # Example config.toml
//!
//! ```toml
//! mode = "whitespace-insensitive"
//! exclude_pattern = "^#"
//! parallel = true
//! workers = 8
//!
//! [stream]
//! buffer_size = 5000
//! poll_interval = 0.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::dedup::{ComparisonMode, ConfigError, EngineConfig, DEFAULT_SIMILARITY};
use crate::orchestrator::{OrchestratorConfig, DEFAULT_WORKERS};
use crate::output::ReportFormat;
use crate::reader::stream::{StreamConfig, DEFAULT_BUFFER_SIZE};
use crate::reader::DEFAULT_CHUNK_SIZE;

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "LINEDUPE_";

/// Settings of stream mode (`[stream]` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Keep polling after reaching the end of the file.
    pub follow: bool,
    /// Seconds between polls.
    pub poll_interval: f64,
    /// Number of recent keys remembered.
    pub buffer_size: usize,
    /// Stop after this many seconds.
    pub max_runtime: Option<f64>,
}

impl StreamSettings {
    /// Poll interval as a non-zero duration.
    fn poll_interval(&self) -> Result<Duration, ConfigError> {
        match Duration::try_from_secs_f64(self.poll_interval) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(ConfigError::InvalidPollInterval(self.poll_interval)),
        }
    }

    fn max_runtime(&self) -> Result<Option<Duration>, ConfigError> {
        self.max_runtime
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidMaxRuntime(secs))
            })
            .transpose()
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            follow: false,
            poll_interval: 1.0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_runtime: None,
        }
    }
}

/// Effective run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comparison mode.
    pub mode: ComparisonMode,
    /// Fuzzy similarity threshold.
    pub similarity: f64,
    /// Lines matching this regex are never removed.
    pub exclude_pattern: Option<String>,
    /// Bytes read per chunk.
    pub chunk_size: usize,
    /// Process files concurrently.
    pub parallel: bool,
    /// Worker threads in parallel mode.
    pub workers: usize,
    /// Report without rewriting files.
    pub dry_run: bool,
    /// Keep a `.bak` copy of every rewritten file.
    pub backup: bool,
    /// Report format of batch runs.
    pub report: ReportFormat,
    /// Color the text report when writing to a terminal.
    pub color: bool,
    /// Stream mode settings.
    pub stream: StreamSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::default(),
            similarity: DEFAULT_SIMILARITY,
            exclude_pattern: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel: false,
            workers: DEFAULT_WORKERS,
            dry_run: false,
            backup: false,
            report: ReportFormat::default(),
            color: true,
            stream: StreamSettings::default(),
        }
    }
}

impl Config {
    /// Default config file location, e.g. `~/.config/linedupe/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "linedupe", "linedupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, then `file` (if any), then the environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration.
    ///
    /// With `explicit` set, that file must exist and parse. Otherwise the
    /// default file is used when present; if it is broken it is logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the explicit file is missing or
    /// invalid, or if the environment holds an unparseable value.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::Load(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::extract(Self::figment(Some(path)));
        }

        match Self::default_path().filter(|p| p.is_file()) {
            Some(path) => match Self::extract(Self::figment(Some(&path))) {
                Ok(config) => {
                    log::debug!("Loaded configuration from {}", path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("Ignoring config file {}: {}", path.display(), e);
                    Self::extract(Self::figment(None))
                }
            },
            None => Self::extract(Self::figment(None)),
        }
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Override values with the flags given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(similarity) = cli.similarity {
            self.similarity = similarity;
        }
        if let Some(pattern) = &cli.exclude {
            self.exclude_pattern = Some(pattern.clone());
        }
        if let Some(chunk_size) = cli.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(report) = cli.report {
            self.report = report;
        }
        self.parallel |= cli.parallel;
        self.dry_run |= cli.dry_run;
        self.backup |= cli.backup;
        if cli.no_color {
            self.color = false;
        }

        self.stream.follow |= cli.follow;
        if let Some(interval) = cli.poll_interval {
            self.stream.poll_interval = interval;
        }
        if let Some(size) = cli.buffer_size {
            self.stream.buffer_size = size;
        }
        if let Some(max_runtime) = cli.max_runtime {
            self.stream.max_runtime = Some(max_runtime);
        }
    }

    /// Check every numeric range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity) {
            return Err(ConfigError::InvalidSimilarity(self.similarity));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        let stream = &self.stream;
        if stream.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }
        stream.poll_interval()?;
        stream.max_runtime()?;
        Ok(())
    }

    /// Engine settings (the exclusion pattern is compiled by the orchestrator).
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.mode).with_similarity(self.similarity)
    }

    /// Orchestrator settings without shutdown flag or progress callback.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default()
            .with_engine(self.engine_config())
            .with_chunk_size(self.chunk_size)
            .with_parallel(self.parallel, self.workers)
            .with_dry_run(self.dry_run)
            .with_backup(self.backup);
        if let Some(pattern) = &self.exclude_pattern {
            config = config.with_exclude_pattern(pattern.clone());
        }
        config
    }

    /// Stream watcher settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the poll interval or max runtime cannot
    /// be represented as a duration.
    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        let stream = &self.stream;
        Ok(StreamConfig::default()
            .with_follow(stream.follow)
            .with_poll_interval(stream.poll_interval()?)
            .with_buffer_size(stream.buffer_size)
            .with_max_runtime(stream.max_runtime()?)
            .with_chunk_size(self.chunk_size))
    }

    /// The configuration as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
