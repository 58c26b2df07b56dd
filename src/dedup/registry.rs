//! Seen-line registry for one engine run.
//!
//! Exact modes keep a set of key digests; fuzzy mode keeps the ordered list
//! of kept lines (fuzzy anchors). Either can be bounded to the most recent
//! `capacity` entries, in which case the oldest entry is evicted first and a
//! repeat of an evicted line is no longer recognised.

use std::collections::{HashSet, VecDeque};

use super::fuzzy::FuzzyProfile;
use super::normalize::KeyDigest;

#[derive(Debug)]
enum Entries {
    Keys {
        seen: HashSet<KeyDigest>,
        // Insertion order, only tracked when bounded
        order: VecDeque<KeyDigest>,
    },
    Anchors(VecDeque<FuzzyProfile>),
}

/// Keys or anchors already kept in the current run.
#[derive(Debug)]
pub struct SeenRegistry {
    entries: Entries,
    capacity: Option<usize>,
    evictions: u64,
}

impl SeenRegistry {
    /// Registry for exact (key equality) modes.
    #[must_use]
    pub fn exact(capacity: Option<usize>) -> Self {
        Self {
            entries: Entries::Keys {
                seen: HashSet::new(),
                order: VecDeque::new(),
            },
            capacity,
            evictions: 0,
        }
    }

    /// Registry for fuzzy mode.
    #[must_use]
    pub fn fuzzy(capacity: Option<usize>) -> Self {
        Self {
            entries: Entries::Anchors(VecDeque::new()),
            capacity,
            evictions: 0,
        }
    }

    /// Record a key, returning `false` if it was already present.
    ///
    /// Always `true` on a fuzzy registry, which holds no keys.
    pub fn insert_key(&mut self, digest: KeyDigest) -> bool {
        let Entries::Keys { seen, order } = &mut self.entries else {
            return true;
        };
        if !seen.insert(digest) {
            return false;
        }
        if let Some(capacity) = self.capacity {
            order.push_back(digest);
            while order.len() > capacity {
                if let Some(oldest) = order.pop_front() {
                    seen.remove(&oldest);
                    self.evictions += 1;
                }
            }
        }
        true
    }

    /// Position of the first anchor, oldest first, whose similarity to
    /// `candidate` reaches `threshold`.
    ///
    /// The scan stops at the first match; a later anchor that would score
    /// higher is never consulted.
    #[must_use]
    pub fn first_similar(&self, candidate: &FuzzyProfile, threshold: f64) -> Option<usize> {
        match &self.entries {
            Entries::Anchors(anchors) => anchors
                .iter()
                .position(|anchor| candidate.is_similar(anchor, threshold)),
            Entries::Keys { .. } => None,
        }
    }

    /// Register a kept line as a fuzzy anchor. Ignored on an exact registry.
    pub fn push_anchor(&mut self, profile: FuzzyProfile) {
        if let Entries::Anchors(anchors) = &mut self.entries {
            anchors.push_back(profile);
            if let Some(capacity) = self.capacity {
                while anchors.len() > capacity {
                    anchors.pop_front();
                    self.evictions += 1;
                }
            }
        }
    }

    /// Number of keys or anchors currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Keys { seen, .. } => seen.len(),
            Entries::Anchors(anchors) => anchors.len(),
        }
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retention bound, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries dropped to honour the bound.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
