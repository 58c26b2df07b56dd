//! Line deduplication core.
//!
//! This module decides, for an ordered stream of lines, which lines are kept:
//! - [`normalize`]: comparison keys per [`ComparisonMode`]
//! - [`fuzzy`]: pairwise similarity for near-duplicate detection
//! - [`exclusion`]: regex rules that protect lines from removal
//! - [`registry`]: the seen-key set or fuzzy anchor list, optionally bounded
//! - [`engine`]: the [`DedupEngine`] tying the above together
//!
//! # Example
//!
//! ```
//! use linedupe::dedup::{ComparisonMode, DedupEngine, EngineConfig};
//! use linedupe::reader::Line;
//!
//! let engine = DedupEngine::new(EngineConfig::new(ComparisonMode::CaseInsensitive)).unwrap();
//! let lines = ["Foo", "bar", "foo"].iter().enumerate().map(|(i, s)| Line::new(*s, i as u64));
//! let output = engine.process(lines);
//!
//! assert_eq!(output.kept.len(), 2);
//! assert_eq!(output.stats.duplicates_removed, 1);
//! ```

pub mod engine;
pub mod exclusion;
pub mod fuzzy;
pub mod normalize;
pub mod registry;

pub use engine::{DedupEngine, EngineConfig, EngineOutput, EngineState, RunStatistics, Verdict};
pub use exclusion::{ExclusionFilter, PatternCache};
pub use fuzzy::{similarity, FuzzyProfile};
pub use normalize::{normalize, ComparisonKey, ComparisonMode, KeyDigest};
pub use registry::SeenRegistry;

/// Default fuzzy similarity threshold.
pub const DEFAULT_SIMILARITY: f64 = 0.8;

/// Configuration problems, detected before any file is touched.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Similarity threshold outside `[0, 1]` (or NaN).
    #[error("Invalid similarity threshold {0}: must be between 0.0 and 1.0")]
    InvalidSimilarity(f64),

    /// Chunk size of zero bytes.
    #[error("Invalid chunk size: must be greater than 0 bytes")]
    InvalidChunkSize,

    /// Exclusion pattern that does not compile.
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern source text
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Stream buffer size of zero.
    #[error("Invalid buffer size: must be greater than 0")]
    InvalidBufferSize,

    /// Poll interval that is not a positive, representable duration.
    #[error("Invalid poll interval {0}: must be a positive number of seconds")]
    InvalidPollInterval(f64),

    /// Max runtime that is negative, not finite or too large.
    #[error("Invalid max runtime {0}: must be zero or a positive number of seconds")]
    InvalidMaxRuntime(f64),

    /// Worker count of zero.
    #[error("Invalid worker count: must be at least 1")]
    InvalidWorkers,

    /// Unknown comparison mode name.
    #[error("Unknown comparison mode '{value}'{}", suggestion_suffix(.suggestion))]
    UnknownMode {
        /// The rejected name
        value: String,
        /// Closest known mode, if any is close enough
        suggestion: Option<String>,
    },

    /// Stream mode was given more or fewer than one path.
    #[error("Stream mode watches exactly one file, got {0} paths")]
    StreamPathCount(usize),

    /// The configuration file or environment could not be read.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}
