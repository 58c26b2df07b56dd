//! Exclusion rules: lines matching a pattern are always kept.
//!
//! Patterns are compiled once at configuration time. A pattern that does not
//! compile is reported as [`ConfigError::InvalidPattern`] before any file is
//! read; evaluation itself never fails.

use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

use super::ConfigError;

/// A compiled exclusion rule.
///
/// Cloning is cheap; every worker gets its own clone.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    regex: Regex,
}

impl ExclusionFilter {
    /// Compile a pattern without going through a cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// The pattern source text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether `raw_line` is protected from duplicate removal.
    ///
    /// Empty and whitespace-only lines are never excluded and never reach
    /// the regex engine.
    #[must_use]
    pub fn is_excluded(&self, raw_line: &str) -> bool {
        if raw_line.trim().is_empty() {
            return false;
        }
        self.regex.is_match(raw_line)
    }
}

/// Compiled patterns keyed by their source text.
///
/// Owned by whoever builds engines for a run, so a pattern shared by many
/// files or workers is compiled once.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Mutex<HashMap<String, ExclusionFilter>>,
}

impl PatternCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled filter for `pattern`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not compile.
    /// Failed patterns are not cached.
    pub fn compile(&self, pattern: &str) -> Result<ExclusionFilter, ConfigError> {
        let mut compiled = self
            .compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(filter) = compiled.get(pattern) {
            log::trace!("Exclusion pattern cache hit: {}", pattern);
            return Ok(filter.clone());
        }

        let filter = ExclusionFilter::new(pattern)?;
        log::debug!("Compiled exclusion pattern: {}", pattern);
        compiled.insert(pattern.to_string(), filter.clone());
        Ok(filter)
    }

    /// Number of cached patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
