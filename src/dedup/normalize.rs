//! Comparison keys for each comparison mode.
//!
//! Normalization is pure and total: every input line maps to exactly one
//! key, characters without a case mapping pass through unchanged, and no
//! mode can fail. The mode is resolved to a plain function pointer once,
//! when the engine is built, so the per-line path never re-dispatches on
//! the mode.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How two lines are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComparisonMode {
    /// Lines differing only in letter case are duplicates.
    #[default]
    CaseInsensitive,
    /// Lines must match exactly.
    CaseSensitive,
    /// Whitespace runs collapse to one space, ends are trimmed, case is folded.
    WhitespaceInsensitive,
    /// Lines with the same multiset of whitespace-separated tokens are duplicates.
    ContentHash,
    /// Only letters and digits are compared, case-folded.
    AlphanumericOnly,
    /// Near-duplicates above a similarity threshold are removed.
    Fuzzy,
}

/// A normalization function selected for one mode.
pub type Normalizer = for<'a> fn(&'a str) -> ComparisonKey<'a>;

impl ComparisonMode {
    /// Every mode, in documentation order.
    pub const ALL: [ComparisonMode; 6] = [
        ComparisonMode::CaseInsensitive,
        ComparisonMode::CaseSensitive,
        ComparisonMode::WhitespaceInsensitive,
        ComparisonMode::ContentHash,
        ComparisonMode::AlphanumericOnly,
        ComparisonMode::Fuzzy,
    ];

    /// The user-facing mode name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CaseInsensitive => "case-insensitive",
            Self::CaseSensitive => "case-sensitive",
            Self::WhitespaceInsensitive => "whitespace-insensitive",
            Self::ContentHash => "content-hash",
            Self::AlphanumericOnly => "alphanumeric-only",
            Self::Fuzzy => "fuzzy",
        }
    }

    /// Whether duplicates are decided by pairwise similarity instead of key equality.
    #[must_use]
    pub fn is_fuzzy(self) -> bool {
        matches!(self, Self::Fuzzy)
    }

    /// The normalization function for this mode.
    #[must_use]
    pub fn normalizer(self) -> Normalizer {
        match self {
            Self::CaseInsensitive => case_insensitive,
            Self::CaseSensitive => case_sensitive,
            Self::WhitespaceInsensitive | Self::Fuzzy => whitespace_insensitive,
            Self::ContentHash => content_hash,
            Self::AlphanumericOnly => alphanumeric_only,
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComparisonMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        if let Some(mode) = Self::ALL.iter().find(|m| m.name() == wanted) {
            return Ok(*mode);
        }

        let suggestion = Self::ALL
            .iter()
            .map(|m| (m.name(), strsim::jaro_winkler(&wanted, m.name())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.to_string());

        Err(ConfigError::UnknownMode {
            value: s.to_string(),
            suggestion,
        })
    }
}

impl TryFrom<String> for ComparisonMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComparisonMode> for String {
    fn from(mode: ComparisonMode) -> Self {
        mode.name().to_string()
    }
}

/// BLAKE3 digest of a comparison key, as stored in the seen registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyDigest([u8; 32]);

/// The normalized form of a line under one comparison mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey<'a>(Cow<'a, str>);

impl<'a> ComparisonKey<'a> {
    /// The key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fixed-size digest used for registry lookups.
    #[must_use]
    pub fn digest(&self) -> KeyDigest {
        KeyDigest(*blake3::hash(self.0.as_bytes()).as_bytes())
    }
}

impl fmt::Display for ComparisonKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a raw line to its comparison key under `mode`.
///
/// # Example
///
/// ```
/// use linedupe::dedup::{normalize, ComparisonMode};
///
/// assert_eq!(normalize("Hello World", ComparisonMode::CaseInsensitive).as_str(), "hello world");
/// assert_eq!(
///     normalize("world  hello", ComparisonMode::ContentHash),
///     normalize("hello world", ComparisonMode::ContentHash),
/// );
/// ```
#[must_use]
pub fn normalize(line: &str, mode: ComparisonMode) -> ComparisonKey<'_> {
    (mode.normalizer())(line)
}

fn case_insensitive(line: &str) -> ComparisonKey<'_> {
    if line.bytes().all(|b| b.is_ascii() && !b.is_ascii_uppercase()) {
        ComparisonKey(Cow::Borrowed(line))
    } else {
        ComparisonKey(Cow::Owned(line.to_lowercase()))
    }
}

fn case_sensitive(line: &str) -> ComparisonKey<'_> {
    ComparisonKey(Cow::Borrowed(line))
}

fn whitespace_insensitive(line: &str) -> ComparisonKey<'_> {
    let mut collapsed = String::with_capacity(line.len());
    for word in line.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.extend(word.chars().flat_map(char::to_lowercase));
    }
    ComparisonKey(Cow::Owned(collapsed))
}

fn content_hash(line: &str) -> ComparisonKey<'_> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.sort_unstable();
    ComparisonKey(Cow::Owned(tokens.join(" ")))
}

fn alphanumeric_only(line: &str) -> ComparisonKey<'_> {
    let filtered: String = line
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    ComparisonKey(Cow::Owned(filtered))
}
