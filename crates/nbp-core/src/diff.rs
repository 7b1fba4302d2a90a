#![forbid(unsafe_code)]

//! Active-set diffing.
//!
//! Pure set difference between the keys rendered last pass and the keys the
//! current snapshot asks for:
//!
//! - `to_create = current - previous`
//! - `to_remove = previous - current`
//! - `to_update = current ∩ previous`
//!
//! Output order is the key order, so passes are deterministic.

use std::collections::BTreeSet;

/// Result of one diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDiff<K> {
    pub to_create: Vec<K>,
    pub to_update: Vec<K>,
    pub to_remove: Vec<K>,
}

impl<K> Default for KeyDiff<K> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

impl<K> KeyDiff<K> {
    /// No keys appear or disappear.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }

    /// Number of keys touched in any way.
    #[inline]
    pub fn total(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_remove.len()
    }
}

/// Compare the previous and current active sets.
pub fn diff<K: Ord + Clone>(previous: &BTreeSet<K>, current: &BTreeSet<K>) -> KeyDiff<K> {
    KeyDiff {
        to_create: current.difference(previous).cloned().collect(),
        to_update: current.intersection(previous).cloned().collect(),
        to_remove: previous.difference(current).cloned().collect(),
    }
}
