//! The batch handed to observers.

use std::sync::Arc;

use super::{Change, ChangeKind};

/// The ordered changes of one delivery cycle.
///
/// Cloning is cheap and every clone shares the same batch, so all observers
/// of a cycle see the same object. The version bump is always the last
/// record.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    changes: Arc<[Change]>,
    version: u64,
}

impl ChangeSet {
    pub(crate) fn new(changes: Vec<Change>, version: u64) -> Self {
        Self {
            changes: changes.into(),
            version,
        }
    }

    /// The model version this batch produced.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    /// True if any record touches `key`.
    pub fn has(&self, key: &str) -> bool {
        self.changes.iter().any(|change| change.key == key)
    }

    pub fn has_any<I, K>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().any(|key| self.has(key.as_ref()))
    }

    pub fn has_all<I, K>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().all(|key| self.has(key.as_ref()))
    }

    /// The latest record for `key`, which carries the net value of the cycle.
    pub fn get(&self, key: &str) -> Option<&Change> {
        self.changes.iter().rev().find(|change| change.key == key)
    }

    /// The first record matching `query`.
    pub fn query(&self, query: &ChangeQuery) -> Option<&Change> {
        self.changes.iter().find(|change| query.matches(change))
    }

    /// Every record matching `query`, in occurrence order.
    pub fn query_all(&self, query: &ChangeQuery) -> Vec<&Change> {
        self.changes
            .iter()
            .filter(|change| query.matches(change))
            .collect()
    }

    /// Distinct keys in first-occurrence order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for change in self.changes.iter() {
            if !keys.contains(&change.key.as_str()) {
                keys.push(&change.key);
            }
        }
        keys
    }

    /// True if both sets are the same batch object.
    pub fn same_batch(&self, other: &ChangeSet) -> bool {
        Arc::ptr_eq(&self.changes, &other.changes)
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Filter for [`ChangeSet::query`]. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQuery {
    kind: Option<ChangeKind>,
    key: Option<String>,
    index: Option<usize>,
}

impl ChangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn matches(&self, change: &Change) -> bool {
        self.kind.map_or(true, |kind| change.kind == kind)
            && self.key.as_deref().map_or(true, |key| change.key == key)
            && self.index.map_or(true, |index| change.index == Some(index))
    }
}
