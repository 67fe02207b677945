//! # Usage Journal
//!
//! Append-only record of the issuances committed against a block. Embedded in
//! each `Block` and persisted with it as a JSON array.
//!
//! The journal exposes no way to remove or rewrite an entry; a duplicate
//! index is refused rather than appended twice.

use super::entities::IssuedEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, append-only list of `IssuedEntry`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal(Vec<IssuedEntry>);

impl Journal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// Returns `false` (and leaves the journal untouched) if the index is
    /// already recorded.
    pub fn append(&mut self, entry: IssuedEntry) -> bool {
        if self.contains_index(entry.index) {
            return false;
        }
        self.0.push(entry);
        true
    }

    /// Whether a slot has been recorded.
    pub fn contains_index(&self, index: u32) -> bool {
        self.0.iter().any(|e| e.index == index)
    }

    /// Entry for a slot, if recorded.
    pub fn get(&self, index: u32) -> Option<&IssuedEntry> {
        self.0.iter().find(|e| e.index == index)
    }

    /// Entry by serial, if recorded.
    pub fn find_serial(&self, serial: &str) -> Option<&IssuedEntry> {
        self.0.iter().find(|e| e.serial == serial)
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&IssuedEntry> {
        self.0.last()
    }

    /// Highest recorded index.
    pub fn highest_index(&self) -> Option<u32> {
        self.0.iter().map(|e| e.index).max()
    }

    /// Lowest cursor value consistent with the recorded entries.
    pub fn cursor_floor(&self) -> u32 {
        self.highest_index().map_or(0, |i| i.saturating_add(1))
    }

    /// First index recorded more than once (only possible in corrupt data).
    pub fn first_duplicate(&self) -> Option<u32> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0.iter().map(|e| e.index).find(|i| !seen.insert(*i))
    }

    /// All entries in commit order.
    pub fn entries(&self) -> &[IssuedEntry] {
        &self.0
    }

    /// Iterate in commit order.
    pub fn iter(&self) -> std::slice::Iter<'_, IssuedEntry> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been issued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Journal {
    type Item = &'a IssuedEntry;
    type IntoIter = std::slice::Iter<'a, IssuedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
