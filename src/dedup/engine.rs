//! The deduplication engine.
//!
//! # Overview
//!
//! For every incoming line, in order:
//! 1. **Exclusion**: a line matching the exclusion rule is kept and never
//!    registered, so it can neither be removed nor cause later removals
//! 2. **Normalization**: the comparison key is computed for the active mode
//! 3. **Exact modes**: a key already in the registry marks a duplicate,
//!    otherwise the key is registered and the line kept
//! 4. **Fuzzy mode**: the line is a duplicate if it reaches the similarity
//!    threshold against any kept anchor (oldest first, first match wins),
//!    otherwise it is kept and becomes an anchor
//! 5. **Statistics** are updated for every line
//!
//! The engine does not care where lines come from: a whole file, a chunked
//! reader or a live stream all go through [`DedupEngine::classify`]. A
//! bounded engine (see [`EngineConfig::with_window`]) forgets the oldest
//! keys once the window is full.
//!
//! # Example
//!
//! ```
//! use linedupe::dedup::{ComparisonMode, DedupEngine, EngineConfig, Verdict};
//!
//! let mut engine = DedupEngine::new(EngineConfig::new(ComparisonMode::ContentHash)).unwrap();
//! assert_eq!(engine.classify("the cat sat"), Verdict::Kept);
//! assert_eq!(engine.classify("sat the cat"), Verdict::Duplicate);
//!
//! let stats = engine.finalize();
//! assert_eq!(stats.total_lines, 2);
//! assert_eq!(stats.duplicates_removed, 1);
//! ```

use std::time::{Duration, Instant};

use super::exclusion::ExclusionFilter;
use super::fuzzy::FuzzyProfile;
use super::normalize::{ComparisonMode, Normalizer};
use super::registry::SeenRegistry;
use super::{ConfigError, DEFAULT_SIMILARITY};
use crate::reader::Line;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Comparison mode.
    pub mode: ComparisonMode,
    /// Fuzzy similarity threshold in `[0, 1]`; ignored by exact modes.
    pub similarity: f64,
    /// Optional exclusion rule.
    pub exclusion: Option<ExclusionFilter>,
    /// Retain at most this many keys or anchors (streaming mode).
    pub window: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::default(),
            similarity: DEFAULT_SIMILARITY,
            exclusion: None,
            window: None,
        }
    }
}

impl EngineConfig {
    /// Configuration for `mode` with default settings.
    #[must_use]
    pub fn new(mode: ComparisonMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the fuzzy similarity threshold.
    #[must_use]
    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set the exclusion rule.
    #[must_use]
    pub fn with_exclusion(mut self, filter: ExclusionFilter) -> Self {
        self.exclusion = Some(filter);
        self
    }

    /// Bound the registry to the `size` most recent keys or anchors.
    #[must_use]
    pub fn with_window(mut self, size: usize) -> Self {
        self.window = Some(size);
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSimilarity`] for a threshold outside
    /// `[0, 1]` and [`ConfigError::InvalidBufferSize`] for a zero window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity) {
            return Err(ConfigError::InvalidSimilarity(self.similarity));
        }
        if self.window == Some(0) {
            return Err(ConfigError::InvalidBufferSize);
        }
        Ok(())
    }
}

/// What the engine decided for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First occurrence of its key (or first member of its fuzzy cluster).
    Kept,
    /// Matched the exclusion rule; kept unconditionally.
    Excluded,
    /// Removed as a duplicate of an earlier kept line.
    Duplicate,
}

impl Verdict {
    /// Whether the line survives.
    #[must_use]
    pub fn is_kept(self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Lifecycle of an engine.
///
/// An engine starts in `Init`, moves to `Running` on its first line and is
/// finalized by [`DedupEngine::finalize`], which consumes it; a finalized
/// run can therefore never receive more lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No line seen yet.
    Init,
    /// At least one line classified.
    Running,
}

/// Per-file counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Lines read
    pub total_lines: u64,
    /// Lines kept, including excluded lines
    pub unique_lines: u64,
    /// Lines removed as duplicates
    pub duplicates_removed: u64,
    /// Lines kept because they matched the exclusion rule
    pub excluded_lines: u64,
    /// Lines containing bytes that could not be decoded
    pub decode_warnings: u64,
    /// Wall-clock time from engine creation to finalization
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Fraction of lines removed, `0.0` for an empty input.
    #[must_use]
    pub fn duplication_rate(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.duplicates_removed as f64 / self.total_lines as f64
        }
    }

    /// Elapsed time in seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Add another run's counters and time to this one.
    pub fn accumulate(&mut self, other: &RunStatistics) {
        self.total_lines += other.total_lines;
        self.unique_lines += other.unique_lines;
        self.duplicates_removed += other.duplicates_removed;
        self.excluded_lines += other.excluded_lines;
        self.decode_warnings += other.decode_warnings;
        self.elapsed += other.elapsed;
    }

    /// Whether the line counters of two runs agree, ignoring timing.
    #[must_use]
    pub fn same_counts(&self, other: &RunStatistics) -> bool {
        self.total_lines == other.total_lines
            && self.unique_lines == other.unique_lines
            && self.duplicates_removed == other.duplicates_removed
            && self.excluded_lines == other.excluded_lines
            && self.decode_warnings == other.decode_warnings
    }
}

/// Result of a completed in-memory run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Surviving lines in input order
    pub kept: Vec<Line>,
    /// Final counters
    pub stats: RunStatistics,
}

/// Order-preserving duplicate line filter.
pub struct DedupEngine {
    mode: ComparisonMode,
    normalizer: Normalizer,
    threshold: f64,
    exclusion: Option<ExclusionFilter>,
    registry: SeenRegistry,
    stats: RunStatistics,
    state: EngineState,
    started: Instant,
}

impl std::fmt::Debug for DedupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupEngine")
            .field("mode", &self.mode)
            .field("threshold", &self.threshold)
            .field("exclusion", &self.exclusion)
            .field("registry_len", &self.registry.len())
            .field("stats", &self.stats)
            .field("state", &self.state)
            .finish()
    }
}

impl DedupEngine {
    /// Build an engine from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is out of range.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = if config.mode.is_fuzzy() {
            SeenRegistry::fuzzy(config.window)
        } else {
            SeenRegistry::exact(config.window)
        };

        Ok(Self {
            mode: config.mode,
            normalizer: config.mode.normalizer(),
            threshold: config.similarity,
            exclusion: config.exclusion,
            registry,
            stats: RunStatistics::default(),
            state: EngineState::Init,
            started: Instant::now(),
        })
    }

    /// Decide the fate of the next line.
    pub fn classify(&mut self, raw: &str) -> Verdict {
        self.state = EngineState::Running;
        self.stats.total_lines += 1;

        let verdict = self.decide(raw);
        match verdict {
            Verdict::Kept => self.stats.unique_lines += 1,
            Verdict::Excluded => {
                self.stats.unique_lines += 1;
                self.stats.excluded_lines += 1;
            }
            Verdict::Duplicate => self.stats.duplicates_removed += 1,
        }

        log::trace!("Line {}: {:?}", self.stats.total_lines, verdict);
        verdict
    }

    fn decide(&mut self, raw: &str) -> Verdict {
        if self
            .exclusion
            .as_ref()
            .is_some_and(|filter| filter.is_excluded(raw))
        {
            return Verdict::Excluded;
        }

        let key = (self.normalizer)(raw);

        if self.mode.is_fuzzy() {
            let candidate = FuzzyProfile::new(key.as_str());
            if self.registry.first_similar(&candidate, self.threshold).is_some() {
                return Verdict::Duplicate;
            }
            self.registry.push_anchor(candidate);
            return Verdict::Kept;
        }

        if self.registry.insert_key(key.digest()) {
            Verdict::Kept
        } else {
            Verdict::Duplicate
        }
    }

    /// Run the engine over a complete sequence of lines.
    #[must_use]
    pub fn process<I>(mut self, lines: I) -> EngineOutput
    where
        I: IntoIterator<Item = Line>,
    {
        let mut kept = Vec::new();
        for line in lines {
            if self.classify(&line.text).is_kept() {
                kept.push(line);
            }
        }
        EngineOutput {
            kept,
            stats: self.finalize(),
        }
    }

    /// Run the engine over a fallible line source.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `lines`. No partial output is
    /// returned in that case.
    pub fn try_process<I, E>(mut self, lines: I) -> Result<EngineOutput, E>
    where
        I: IntoIterator<Item = Result<Line, E>>,
    {
        let mut kept = Vec::new();
        for line in lines {
            let line = line?;
            if self.classify(&line.text).is_kept() {
                kept.push(line);
            }
        }
        Ok(EngineOutput {
            kept,
            stats: self.finalize(),
        })
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The active comparison mode.
    #[must_use]
    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// The seen registry.
    #[must_use]
    pub fn registry(&self) -> &SeenRegistry {
        &self.registry
    }

    /// Finish the run and return its statistics.
    #[must_use]
    pub fn finalize(mut self) -> RunStatistics {
        self.stats.elapsed = self.started.elapsed();
        log::debug!(
            "Engine finalized ({}): {} lines, {} kept, {} removed, {} evicted",
            self.mode,
            self.stats.total_lines,
            self.stats.unique_lines,
            self.stats.duplicates_removed,
            self.registry.evictions()
        );
        self.stats
    }
}
