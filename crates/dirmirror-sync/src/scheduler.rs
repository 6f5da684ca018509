//! Cycle scheduler - runs reconciliation cycles on a fixed period
//!
//! The [`CycleScheduler`] owns the [`SyncEngine`] and the carry-over change
//! set, which is the only state kept between cycles.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   carry   ┌───────────┐   period / cancel   ┌──────────┐
//! │  cycle n │ ───────→  │   idle    │ ──────────────────→ │ cycle n+1│
//! └──────────┘           └───────────┘                     └──────────┘
//! ```
//!
//! A running cycle is never interrupted. Cancellation is observed before a
//! cycle starts and while idling; on exit any carry-over is flushed to the
//! ledger once more.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dirmirror_core::domain::LedgerChangeSet;

use crate::engine::{CycleResult, LedgerCommit, SyncEngine};

/// Drives [`SyncEngine::run_cycle`] until shutdown
pub struct CycleScheduler {
    engine: SyncEngine,
    /// Idle time between the end of one cycle and the start of the next
    period: Duration,
    shutdown: CancellationToken,
}

impl CycleScheduler {
    /// Creates a new `CycleScheduler`
    ///
    /// # Arguments
    /// * `engine` - The reconciliation engine
    /// * `period` - Idle interval between cycles
    /// * `shutdown` - Token cancelled on SIGINT/SIGTERM
    pub fn new(engine: SyncEngine, period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            period,
            shutdown,
        }
    }

    /// Runs cycles until the shutdown token is cancelled
    ///
    /// Returns the number of cycles run.
    pub async fn run(&self) -> u64 {
        info!(period_secs = self.period.as_secs(), "Scheduler starting");

        let mut carry = LedgerChangeSet::new();
        let mut cycles = 0u64;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let result = self.engine.run_cycle(carry).await;
            cycles += 1;
            carry = result.carry_over;

            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.flush(&carry).await;
        info!(cycles, "Scheduler stopped");
        cycles
    }

    /// Runs exactly one cycle with `carry` and flushes its carry-over
    ///
    /// Used for `--once`: a commit failure gets one more attempt before the
    /// process exits.
    pub async fn run_once(&self, carry: LedgerChangeSet) -> CycleResult {
        let mut result = self.engine.run_cycle(carry).await;
        if self.flush(&result.carry_over).await == LedgerCommit::Committed {
            result.carry_over = LedgerChangeSet::new();
        }
        result
    }

    async fn flush(&self, carry: &LedgerChangeSet) -> LedgerCommit {
        if carry.is_empty() {
            return LedgerCommit::Committed;
        }

        let status = self.engine.flush(carry).await;
        if let LedgerCommit::Failed(reason) = &status {
            warn!(
                %reason,
                upserts = carry.upserts().len(),
                "Carried ledger changes lost; affected files will not be checked for changes"
            );
        }
        status
    }
}
