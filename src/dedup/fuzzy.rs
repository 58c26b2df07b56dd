//! Pairwise similarity for fuzzy mode.
//!
//! The score is the Ratcliff/Obershelp ratio `2 * M / T`, where `T` is the
//! total number of characters in both lines and `M` the number of characters
//! in matching blocks: the longest common block is found, then the same
//! search recurses into the unmatched text on either side of it.
//!
//! A [`FuzzyProfile`] holds a line's characters together with a
//! character-to-positions index. Profiles are built once per line, so a kept
//! line that serves as a fuzzy anchor is indexed once and then compared
//! against every later line without re-scanning its text.

use std::collections::HashMap;

/// A line prepared for repeated similarity comparisons.
#[derive(Debug, Clone)]
pub struct FuzzyProfile {
    chars: Vec<char>,
    positions: HashMap<char, Vec<usize>>,
}

impl FuzzyProfile {
    /// Index a normalized line.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (idx, c) in chars.iter().enumerate() {
            positions.entry(*c).or_default().push(idx);
        }
        Self { chars, positions }
    }

    /// Number of characters in the line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the line is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Similarity in `[0, 1]`; symmetric, and 1.0 for identical lines.
    #[must_use]
    pub fn ratio(&self, other: &FuzzyProfile) -> f64 {
        let total = self.len() + other.len();
        if total == 0 {
            return 1.0;
        }
        // Block selection depends on argument order when several longest
        // blocks tie, so a fixed order keeps the score symmetric.
        let (a, b) = if self.chars <= other.chars {
            (self, other)
        } else {
            (other, self)
        };
        2.0 * matching_characters(a, b) as f64 / total as f64
    }

    /// Cheap upper bound on [`ratio`](Self::ratio) from the lengths alone.
    #[must_use]
    pub fn ratio_upper_bound(&self, other: &FuzzyProfile) -> f64 {
        let total = self.len() + other.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.len().min(other.len()) as f64 / total as f64
    }

    /// Whether the similarity to `other` reaches `threshold`.
    ///
    /// Skips the full comparison when the length bound already rules it out;
    /// the answer is always the same as `ratio(other) >= threshold`.
    #[must_use]
    pub fn is_similar(&self, other: &FuzzyProfile, threshold: f64) -> bool {
        if self.ratio_upper_bound(other) < threshold {
            return false;
        }
        self.ratio(other) >= threshold
    }
}

/// Similarity of two normalized lines.
///
/// # Example
///
/// ```
/// use linedupe::dedup::similarity;
///
/// assert_eq!(similarity("hello world", "hello world"), 1.0);
/// assert_eq!(similarity("hello", ""), 0.0);
/// assert_eq!(similarity("hello world", "hello wox"), 0.8);
/// ```
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    FuzzyProfile::new(a).ratio(&FuzzyProfile::new(b))
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_characters(a: &FuzzyProfile, b: &FuzzyProfile) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    let mut scratch = Scratch::default();

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, (alo, ahi), (blo, bhi), &mut scratch);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

#[derive(Default)]
struct Scratch {
    run_lengths: HashMap<usize, usize>,
    next_lengths: HashMap<usize, usize>,
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &FuzzyProfile,
    b: &FuzzyProfile,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
    scratch: &mut Scratch,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    scratch.run_lengths.clear();

    for i in alo..ahi {
        scratch.next_lengths.clear();
        if let Some(positions) = b.positions.get(&a.chars[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let previous = if j > 0 {
                    scratch.run_lengths.get(&(j - 1)).copied().unwrap_or(0)
                } else {
                    0
                };
                let run = previous + 1;
                scratch.next_lengths.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        std::mem::swap(&mut scratch.run_lengths, &mut scratch.next_lengths);
    }

    (best_i, best_j, best_size)
}
