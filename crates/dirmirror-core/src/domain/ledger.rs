//! Ledger domain types
//!
//! The ledger maps each synchronized file to the instant its last upload
//! completed. [`LedgerSnapshot`] is the in-memory view read at cycle start;
//! [`LedgerChangeSet`] is what one cycle writes back, committed atomically.

use std::collections::{BTreeMap, BTreeSet};

use super::newtypes::{FileName, SyncInstant};

/// Point-in-time copy of the persisted ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    entries: BTreeMap<FileName, SyncInstant>,
}

impl LedgerSnapshot {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Instant recorded for `name`, if tracked
    pub fn get(&self, name: &FileName) -> Option<&SyncInstant> {
        self.entries.get(name)
    }

    /// Records `instant` for `name`, replacing any previous value
    pub fn insert(&mut self, name: FileName, instant: SyncInstant) -> Option<SyncInstant> {
        self.entries.insert(name, instant)
    }

    /// Applies every upsert of `changes` (later values win)
    pub fn merge_upserts(&mut self, changes: &LedgerChangeSet) {
        for (name, instant) in changes.upserts() {
            self.entries.insert(name.clone(), instant.clone());
        }
    }

    /// Removes every key not present in `keep` and returns the removed keys
    pub fn prune_absent(&mut self, keep: &BTreeSet<FileName>) -> BTreeSet<FileName> {
        let stale: BTreeSet<FileName> = self
            .entries
            .keys()
            .filter(|name| !keep.contains(*name))
            .cloned()
            .collect();

        for name in &stale {
            self.entries.remove(name);
        }

        stale
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(FileName, SyncInstant)> for LedgerSnapshot {
    fn from_iter<I: IntoIterator<Item = (FileName, SyncInstant)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Ledger mutations produced by one cycle
///
/// A name is never both upserted and deleted: recording one side removes
/// the name from the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerChangeSet {
    upserts: BTreeMap<FileName, SyncInstant>,
    deletions: BTreeSet<FileName>,
}

impl LedgerChangeSet {
    /// Creates an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert-or-update for `name`
    pub fn upsert(&mut self, name: FileName, instant: SyncInstant) {
        self.deletions.remove(&name);
        self.upserts.insert(name, instant);
    }

    /// Records a deletion of `name`
    pub fn delete(&mut self, name: FileName) {
        self.upserts.remove(&name);
        self.deletions.insert(name);
    }

    /// Pending upserts in name order
    pub fn upserts(&self) -> &BTreeMap<FileName, SyncInstant> {
        &self.upserts
    }

    /// Pending deletions in name order
    pub fn deletions(&self) -> &BTreeSet<FileName> {
        &self.deletions
    }

    /// Keeps only the upserts, dropping deletions
    ///
    /// Deletions never need carrying into a later cycle: pruning derives them
    /// again from the rows still present in the store.
    #[must_use]
    pub fn into_upserts_only(self) -> Self {
        Self {
            upserts: self.upserts,
            deletions: BTreeSet::new(),
        }
    }

    /// Drops upserts for names not in `keep`
    pub fn retain_names(&mut self, keep: &BTreeSet<FileName>) {
        self.upserts.retain(|name, _| keep.contains(name));
    }

    /// Total number of mutations
    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletions.len()
    }

    /// Returns true if there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }
}
