//! Live-file line source.
//!
//! [`StreamWatcher`] tails a file that is being appended to. Each poll cycle
//! it checks the stop conditions, reads the bytes appended since the last
//! read offset, and hands out the completed lines. When it has caught up and
//! follow mode is on, it sleeps until the next poll instead of spinning.
//!
//! A file that shrinks below the read offset (log rotation, truncation) is
//! read again from the start.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    detect_encoding, open_regular_file, FileAccessError, Line, LineSplitter, RawLine,
    StopReason, TextEncoding, DEFAULT_CHUNK_SIZE,
};
use crate::dedup::ConfigError;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of recent lines remembered for duplicate detection.
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Stream watching options.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Delay between polls once caught up
    pub poll_interval: Duration,
    /// Recent keys (or fuzzy anchors) remembered for duplicate detection
    pub buffer_size: usize,
    /// Keep polling for appended data after reaching the end
    pub follow: bool,
    /// Stop after this long; `None` runs until stopped
    pub max_runtime: Option<Duration>,
    /// Maximum bytes read per poll
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            follow: false,
            max_runtime: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamConfig {
    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enable or disable follow mode.
    #[must_use]
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Set the maximum runtime.
    #[must_use]
    pub fn with_max_runtime(mut self, max_runtime: Option<Duration>) -> Self {
        self.max_runtime = max_runtime;
        self
    }

    /// Set the per-poll read size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero buffer size, poll interval or
    /// chunk size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval(0.0));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }
}

/// Timer-gated pull loop over a growing file.
///
/// Iterating yields lines until the file is exhausted (follow off), the
/// maximum runtime elapses, or the shutdown flag is raised; the reason is
/// then available from [`stop_reason`](Self::stop_reason). In follow mode an
/// unterminated last line is held back until it is completed or the watch
/// stops.
#[derive(Debug)]
pub struct StreamWatcher {
    path: PathBuf,
    config: StreamConfig,
    shutdown: Arc<AtomicBool>,
    encoding: Option<TextEncoding>,
    offset: u64,
    buffer: Vec<u8>,
    splitter: LineSplitter,
    pending: VecDeque<RawLine>,
    next_index: u64,
    decode_warnings: u64,
    polls: u64,
    truncations: u64,
    started: Instant,
    stopped: Option<StopReason>,
}

impl StreamWatcher {
    /// Watch `path`, starting at its first byte.
    ///
    /// # Errors
    ///
    /// Returns a [`FileAccessError`] if the file does not exist or is not a
    /// regular file.
    pub fn new(
        path: &Path,
        config: StreamConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, FileAccessError> {
        let file_len = open_regular_file(path)?
            .metadata()
            .map_err(|e| FileAccessError::from_io(path, e))?
            .len();
        // Data appended later is read in further chunks.
        let buffer_len = usize::try_from(file_len.max(DEFAULT_CHUNK_SIZE as u64))
            .map_or(config.chunk_size, |cap| config.chunk_size.min(cap))
            .max(1);

        log::info!(
            "Watching {} (follow: {}, buffer: {} lines, poll every {:.2}s)",
            path.display(),
            config.follow,
            config.buffer_size,
            config.poll_interval.as_secs_f64()
        );

        Ok(Self {
            path: path.to_path_buf(),
            buffer: vec![0; buffer_len],
            config,
            shutdown,
            encoding: None,
            offset: 0,
            splitter: LineSplitter::new(0),
            pending: VecDeque::new(),
            next_index: 0,
            decode_warnings: 0,
            polls: 0,
            truncations: 0,
            started: Instant::now(),
            stopped: None,
        })
    }

    /// The watch configuration.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Why the watch ended, once it has.
    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Byte offset up to which the file has been read.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Completed poll reads.
    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Times the file was found truncated and re-read from the start.
    #[must_use]
    pub fn truncations(&self) -> u64 {
        self.truncations
    }

    /// Lines in which undecodable bytes were replaced so far.
    #[must_use]
    pub fn decode_warnings(&self) -> u64 {
        self.decode_warnings
    }

    /// Whether lines read by the last poll are still waiting to be handed out.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Next line, or `None` once the watch has stopped.
    ///
    /// Blocks between polls while following a file that is not growing.
    ///
    /// # Errors
    ///
    /// Returns a [`FileAccessError`] if the file becomes unreadable. The
    /// watch can be resumed by calling this again.
    pub fn next_line(&mut self) -> Result<Option<Line>, FileAccessError> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                let encoding = self.encoding.unwrap_or_default();
                let line = raw.decode(self.next_index, encoding, &mut self.decode_warnings);
                self.next_index += 1;
                return Ok(Some(line));
            }
            if self.stopped.is_some() {
                return Ok(None);
            }

            if let Some(reason) = self.stop_condition() {
                self.stop(reason);
                continue;
            }

            let read = self.poll()?;
            if read == 0 && self.pending.is_empty() {
                if self.config.follow {
                    self.idle();
                } else {
                    self.stop(StopReason::EndOfFile);
                }
            }
        }
    }

    /// Read at most one chunk of newly appended bytes.
    ///
    /// Returns the number of bytes read; zero means the watcher has caught up.
    ///
    /// # Errors
    ///
    /// Returns a [`FileAccessError`] if the file cannot be opened or read.
    pub fn poll(&mut self) -> Result<usize, FileAccessError> {
        let mut file = open_regular_file(&self.path)?;
        let len = file
            .metadata()
            .map_err(|e| FileAccessError::from_io(&self.path, e))?
            .len();

        if len < self.offset {
            log::warn!(
                "{} shrank from {} to {} bytes; reading again from the start",
                self.path.display(),
                self.offset,
                len
            );
            self.truncations += 1;
            self.offset = 0;
            self.encoding = None;
            self.splitter = LineSplitter::new(0);
        }
        if len == self.offset {
            return Ok(0);
        }

        if self.encoding.is_none() {
            let encoding = detect_encoding(&self.path)?;
            if self.offset == 0 && !encoding.bom().is_empty() {
                self.offset = encoding.bom().len() as u64;
                self.splitter = LineSplitter::new(self.offset);
            }
            self.encoding = Some(encoding);
        }

        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| FileAccessError::from_io(&self.path, e))?;
        let read = loop {
            match file.read(&mut self.buffer) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => break result.map_err(|e| FileAccessError::from_io(&self.path, e))?,
            }
        };

        self.splitter.push(&self.buffer[..read], &mut self.pending);
        self.offset += read as u64;
        self.polls += 1;
        log::trace!(
            "Poll {} read {} bytes from {} (offset {})",
            self.polls,
            read,
            self.path.display(),
            self.offset
        );
        Ok(read)
    }

    fn stop_condition(&self) -> Option<StopReason> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Some(StopReason::Shutdown);
        }
        match self.config.max_runtime {
            Some(limit) if self.started.elapsed() >= limit => Some(StopReason::Timeout),
            _ => None,
        }
    }

    fn stop(&mut self, reason: StopReason) {
        self.pending.extend(self.splitter.finish());
        self.stopped = Some(reason);
        log::info!(
            "Stopped watching {}: {} ({} bytes read)",
            self.path.display(),
            reason,
            self.offset
        );
    }

    fn idle(&self) {
        let mut wait = self.config.poll_interval;
        if let Some(limit) = self.config.max_runtime {
            wait = wait.min(limit.saturating_sub(self.started.elapsed()));
        }
        std::thread::sleep(wait);
    }
}

impl Iterator for StreamWatcher {
    type Item = Result<Line, FileAccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
