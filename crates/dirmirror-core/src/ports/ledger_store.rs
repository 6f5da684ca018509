//! Ledger store port (driven/secondary port)
//!
//! This module defines the interface for persisting the ledger, the
//! `filename → last-sync-instant` mapping that is the daemon's only durable
//! state.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific and
//!   the engine only needs to know that a write did not happen.
//! - [`ILedgerStore::commit`] is the write path the engine uses; `upsert`
//!   and `delete` are single-row conveniences.

use crate::domain::{
    ledger::{LedgerChangeSet, LedgerSnapshot},
    newtypes::{FileName, SyncInstant},
};

/// Port for the persisted ledger
#[async_trait::async_trait]
pub trait ILedgerStore: Send + Sync {
    /// Reads every entry of the ledger
    ///
    /// Only a failure to reach the storage is an error. An entry whose
    /// instant cannot be read comes back as [`SyncInstant::earliest`], so the
    /// file is treated as modified.
    async fn read_all(&self) -> anyhow::Result<LedgerSnapshot>;

    /// Inserts or updates the instant recorded for `name`
    ///
    /// Idempotent: repeating the call with the same arguments leaves the
    /// ledger unchanged.
    async fn upsert(&self, name: &FileName, instant: &SyncInstant) -> anyhow::Result<()>;

    /// Removes `name` from the ledger; a no-op if it is not tracked
    async fn delete(&self, name: &FileName) -> anyhow::Result<()>;

    /// Applies every upsert and deletion of `changes` atomically
    ///
    /// # Errors
    /// On error none of the changes are visible
    async fn commit(&self, changes: &LedgerChangeSet) -> anyhow::Result<()>;

    /// Number of tracked files
    async fn len(&self) -> anyhow::Result<usize>;
}
