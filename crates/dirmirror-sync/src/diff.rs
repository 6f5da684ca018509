//! Snapshot diffing
//!
//! Pure functions over the local, remote and ledger snapshots. No I/O; the
//! engine feeds the results into the remote connector.

use std::collections::BTreeSet;

use dirmirror_core::domain::{FileName, SyncInstant};

/// Names present locally and missing remotely (to upload, overwrite = false)
pub fn new_files(local: &BTreeSet<FileName>, remote: &BTreeSet<FileName>) -> Vec<FileName> {
    local.difference(remote).cloned().collect()
}

/// Names present remotely and missing locally (to delete)
pub fn orphans(local: &BTreeSet<FileName>, remote: &BTreeSet<FileName>) -> Vec<FileName> {
    remote.difference(local).cloned().collect()
}

/// Names whose modification time must be checked against the ledger
///
/// Names handled by [`new_files`] are excluded, so a file is never uploaded
/// twice in one cycle.
///
/// Only names present on both sides qualify. A tracked local file that the
/// listing reports missing is left to the plain upload, even though a lagging
/// listing can hide an object that still exists. In that case the upload
/// fails with `Conflict` and is retried, and the same happens every cycle
/// until the listing shows the object again. Retrying as an overwrite would
/// clear it sooner but would also overwrite whatever another client put there.
pub fn change_candidates(local: &BTreeSet<FileName>, remote: &BTreeSet<FileName>) -> Vec<FileName> {
    local.intersection(remote).cloned().collect()
}

/// Returns true if a file modified at `modified` must be re-uploaded
///
/// Untracked files never trigger an overwrite; only a strictly newer
/// modification than the recorded sync does.
pub fn needs_overwrite(last_sync: Option<&SyncInstant>, modified: &SyncInstant) -> bool {
    last_sync.is_some_and(|synced| modified > synced)
}
