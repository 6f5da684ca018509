//! Reconciliation engine
//!
//! The [`SyncEngine`] runs one cycle of one-way reconciliation from the
//! watched directory to the remote root.
//!
//! ## Cycle Flow
//!
//! 1. **Snapshots**: list local files, list remote objects, read the ledger.
//!    If any of the three fails the cycle stops here with no mutation.
//! 2. **New files**: upload every local name missing remotely.
//! 3. **Orphans**: delete every remote name missing locally.
//! 4. **Changes**: overwrite every tracked file modified after its last sync.
//! 5. **Merge**: record the completion instant of each successful upload.
//! 6. **Prune**: drop ledger entries with no local file.
//! 7. **Persist**: commit the ledger changes in one transaction.
//!
//! Steps 2 and 3 touch disjoint names and form one phase; step 4 is a second
//! phase started only after the first has fully settled. Steps 5-7 run after
//! both phases. Within a phase at most `max_concurrent_actions` remote calls
//! are in flight.
//!
//! ## Failure Handling
//!
//! Nothing is retried within a cycle. A failed upload leaves the ledger
//! untouched for that file, so the next cycle tries again. A rejected
//! credential stops all further remote calls for the rest of the cycle. If
//! the ledger commit fails, its upserts are returned as carry-over and
//! re-applied by the next cycle without repeating the uploads.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use dirmirror_core::domain::{
    ActionKind, ActionOutcome, ActionRecord, FileName, LedgerChangeSet, LedgerSnapshot,
    SyncInstant,
};
use dirmirror_core::ports::{ILedgerStore, ILocalObserver, IRemoteConnector, RemoteError};

use crate::diff;

// ============================================================================
// CycleResult
// ============================================================================

/// Outcome of the end-of-cycle ledger write
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LedgerCommit {
    /// Every change of the cycle is durable
    Committed,
    /// The transaction was rolled back; the upserts are in the carry-over
    Failed(String),
    /// The cycle was aborted before reaching the ledger write
    #[default]
    NotAttempted,
}

/// A file the cycle deliberately left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: FileName,
    pub reason: String,
}

/// Summary of one reconciliation cycle
#[derive(Debug, Clone, Default)]
pub struct CycleResult {
    /// Every remote action issued, in completion order
    pub actions: Vec<ActionRecord>,
    /// Files not acted on (vanished, unreadable, or skipped after a fatal error)
    pub skipped: Vec<SkippedFile>,
    /// Number of ledger entries removed because their file is gone
    pub pruned: usize,
    /// Status of the ledger write
    pub ledger_commit: LedgerCommit,
    /// Why the cycle stopped before issuing actions, if it did
    pub aborted: Option<String>,
    /// Ledger changes the next cycle must re-apply
    pub carry_over: LedgerChangeSet,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl CycleResult {
    fn succeeded(&self, kind: ActionKind) -> usize {
        self.actions
            .iter()
            .filter(|a| a.kind == kind && a.outcome.is_success())
            .count()
    }

    /// Number of new files uploaded
    pub fn uploaded(&self) -> usize {
        self.succeeded(ActionKind::Upload)
    }

    /// Number of modified files re-uploaded
    pub fn overwritten(&self) -> usize {
        self.succeeded(ActionKind::Overwrite)
    }

    /// Number of orphaned remote objects deleted
    pub fn deleted(&self) -> usize {
        self.succeeded(ActionKind::Delete)
    }

    /// Number of remote actions that failed
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Remote actions that failed
    pub fn failures(&self) -> impl Iterator<Item = &ActionRecord> {
        self.actions.iter().filter(|a| !a.outcome.is_success())
    }

    /// True if every action succeeded, nothing was skipped and the ledger
    /// write went through
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none()
            && self.skipped.is_empty()
            && self.failed() == 0
            && self.ledger_commit == LedgerCommit::Committed
    }
}

/// Per-file result of a phase, before aggregation
enum Settled {
    Done {
        record: ActionRecord,
        /// Set for successful uploads: the instant to record in the ledger
        completed_at: Option<SyncInstant>,
    },
    Skipped(SkippedFile),
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way reconciliation engine
///
/// ## Dependencies
///
/// - `remote`: the mirrored object store
/// - `local`: the watched directory
/// - `ledger`: durable `filename → last-sync-instant` mapping
pub struct SyncEngine {
    remote: Arc<dyn IRemoteConnector + Send + Sync>,
    local: Arc<dyn ILocalObserver + Send + Sync>,
    ledger: Arc<dyn ILedgerStore + Send + Sync>,
    /// Upper bound on remote calls in flight within a phase
    max_concurrent_actions: usize,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` issuing one remote call at a time
    pub fn new(
        remote: Arc<dyn IRemoteConnector + Send + Sync>,
        local: Arc<dyn ILocalObserver + Send + Sync>,
        ledger: Arc<dyn ILedgerStore + Send + Sync>,
    ) -> Self {
        Self {
            remote,
            local,
            ledger,
            max_concurrent_actions: 1,
        }
    }

    /// Allows up to `n` concurrent remote calls per phase (minimum 1)
    #[must_use]
    pub fn with_max_concurrent_actions(mut self, n: usize) -> Self {
        self.max_concurrent_actions = n.max(1);
        self
    }

    /// Runs one reconciliation cycle
    ///
    /// `carry` is the carry-over of the previous cycle (empty on the first
    /// one). Never fails: every problem is recorded in the returned
    /// [`CycleResult`].
    #[tracing::instrument(skip_all, fields(carried = carry.upserts().len()))]
    pub async fn run_cycle(&self, carry: LedgerChangeSet) -> CycleResult {
        let start = Instant::now();
        let mut result = CycleResult::default();

        // Step 1: snapshots
        let (local_names, remote_names, mut ledger) = match self.take_snapshots().await {
            Ok(snapshots) => snapshots,
            Err(reason) => {
                warn!(%reason, "Sync cycle aborted before any action");
                result.aborted = Some(reason);
                result.carry_over = carry;
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        // Upserts of a failed commit whose file is still present are
        // treated as already synchronized.
        let mut pending = carry.into_upserts_only();
        pending.retain_names(&local_names);
        ledger.merge_upserts(&pending);

        let halted = AtomicBool::new(false);

        // Steps 2 and 3: new files and orphans
        let mut phase_one: Vec<(FileName, ActionKind)> = diff::new_files(&local_names, &remote_names)
            .into_iter()
            .map(|name| (name, ActionKind::Upload))
            .collect();
        phase_one.extend(
            diff::orphans(&local_names, &remote_names)
                .into_iter()
                .map(|name| (name, ActionKind::Delete)),
        );

        let settled: Vec<Settled> = stream::iter(phase_one)
            .map(|(name, kind)| self.apply(name, kind, &halted))
            .buffer_unordered(self.max_concurrent_actions)
            .collect()
            .await;
        absorb(settled, &mut pending, &mut result);

        // Step 4: modified files
        let ledger_view = &ledger;
        let settled: Vec<Option<Settled>> =
            stream::iter(diff::change_candidates(&local_names, &remote_names))
                .map(|name| {
                    let last_sync = ledger_view.get(&name).cloned();
                    self.overwrite_if_changed(name, last_sync, &halted)
                })
                .buffer_unordered(self.max_concurrent_actions)
                .collect()
                .await;
        absorb(settled.into_iter().flatten(), &mut pending, &mut result);

        // Step 5: merge
        ledger.merge_upserts(&pending);

        // Step 6: prune
        let pruned = ledger.prune_absent(&local_names);
        result.pruned = pruned.len();
        let mut changes = pending;
        for name in pruned {
            debug!(file = %name, "Pruning ledger entry");
            changes.delete(name);
        }

        // Step 7: persist
        result.ledger_commit = match self.ledger.commit(&changes).await {
            Ok(()) => LedgerCommit::Committed,
            Err(e) => {
                let reason = format!("{e:#}");
                error!(
                    error = %reason,
                    upserts = changes.upserts().len(),
                    "Ledger commit failed, carrying upserts to the next cycle"
                );
                result.carry_over = changes.into_upserts_only();
                LedgerCommit::Failed(reason)
            }
        };

        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            uploaded = result.uploaded(),
            overwritten = result.overwritten(),
            deleted = result.deleted(),
            failed = result.failed(),
            skipped = result.skipped.len(),
            pruned = result.pruned,
            duration_ms = result.duration_ms,
            "Sync cycle completed"
        );

        result
    }

    /// Writes a carry-over to the ledger outside of a cycle
    ///
    /// Used at shutdown so uploads whose ledger write failed are not
    /// forgotten.
    pub async fn flush(&self, carry: &LedgerChangeSet) -> LedgerCommit {
        if carry.is_empty() {
            return LedgerCommit::Committed;
        }

        match self.ledger.commit(carry).await {
            Ok(()) => {
                info!(upserts = carry.upserts().len(), "Flushed carried ledger changes");
                LedgerCommit::Committed
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(error = %reason, "Failed to flush carried ledger changes");
                LedgerCommit::Failed(reason)
            }
        }
    }

    /// Reads the local listing, the remote listing and the ledger
    async fn take_snapshots(
        &self,
    ) -> Result<(BTreeSet<FileName>, BTreeSet<FileName>, LedgerSnapshot), String> {
        let (local, remote, ledger) = tokio::join!(
            self.local.list(),
            self.remote.list(),
            self.ledger.read_all()
        );

        let local = local.map_err(|e| format!("local listing failed: {e:#}"))?;
        let remote = remote.map_err(|e| format!("remote listing failed: {e}"))?;
        let ledger = ledger.map_err(|e| format!("ledger read failed: {e:#}"))?;

        debug!(
            local = local.len(),
            remote = remote.len(),
            ledger = ledger.len(),
            "Snapshots taken"
        );

        Ok((local, remote, ledger))
    }

    /// Step 4 for one file: compare its modification time with the ledger
    async fn overwrite_if_changed(
        &self,
        name: FileName,
        last_sync: Option<SyncInstant>,
        halted: &AtomicBool,
    ) -> Option<Settled> {
        let modified = match self.local.modified_at(&name).await {
            Ok(Some(modified)) => modified,
            Ok(None) => {
                warn!(file = %name, "File vanished before its modification time was read");
                return Some(Settled::Skipped(SkippedFile {
                    name,
                    reason: "file not found".into(),
                }));
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Cannot read modification time");
                return Some(Settled::Skipped(SkippedFile {
                    name,
                    reason: format!("{e:#}"),
                }));
            }
        };

        if !diff::needs_overwrite(last_sync.as_ref(), &modified) {
            return None;
        }

        debug!(file = %name, %modified, "File changed since last sync");
        Some(self.apply(name, ActionKind::Overwrite, halted).await)
    }

    /// Issues one remote action unless the cycle has been halted
    async fn apply(&self, name: FileName, kind: ActionKind, halted: &AtomicBool) -> Settled {
        if halted.load(Ordering::Acquire) {
            return Settled::Skipped(SkippedFile {
                name,
                reason: format!("{kind} skipped: remote rejected credentials earlier this cycle"),
            });
        }

        let result = match kind {
            ActionKind::Upload | ActionKind::Overwrite => {
                let path = self.local.path_of(&name);
                self.remote
                    .upload(&path, &name, kind == ActionKind::Overwrite)
                    .await
            }
            ActionKind::Delete => match self.remote.delete(&name).await {
                Err(e) if e.is_not_found() => {
                    debug!(file = %name, "Remote object already gone");
                    Ok(())
                }
                other => other,
            },
        };

        let outcome = match result {
            Ok(()) => {
                info!(file = %name, action = %kind, "Remote action succeeded");
                ActionOutcome::Succeeded
            }
            Err(e) => classify(&name, kind, e),
        };

        if outcome.is_fatal() {
            halted.store(true, Ordering::Release);
        }

        let completed_at = (outcome.is_success() && kind != ActionKind::Delete).then(SyncInstant::now);

        Settled::Done {
            record: ActionRecord::new(name, kind, outcome),
            completed_at,
        }
    }
}

/// Maps a connector error to an outcome and logs it
fn classify(name: &FileName, kind: ActionKind, err: RemoteError) -> ActionOutcome {
    if err.is_fatal() {
        error!(
            file = %name,
            action = %kind,
            error = %err,
            "Remote rejected credentials, skipping remaining actions this cycle"
        );
        ActionOutcome::Fatal(err.to_string())
    } else if err.is_transient() {
        warn!(file = %name, action = %kind, error = %err, "Remote action failed, retrying next cycle");
        ActionOutcome::Retryable(err.to_string())
    } else {
        error!(file = %name, action = %kind, error = %err, "Remote action rejected, retrying next cycle");
        ActionOutcome::Retryable(err.to_string())
    }
}

/// Folds settled actions into the pending ledger changes and the report
fn absorb(
    settled: impl IntoIterator<Item = Settled>,
    pending: &mut LedgerChangeSet,
    result: &mut CycleResult,
) {
    for item in settled {
        match item {
            Settled::Done {
                record,
                completed_at,
            } => {
                if let Some(instant) = completed_at {
                    pending.upsert(record.name.clone(), instant);
                }
                result.actions.push(record);
            }
            Settled::Skipped(skipped) => result.skipped.push(skipped),
        }
    }
}
