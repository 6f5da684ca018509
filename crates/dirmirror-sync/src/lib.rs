//! dirmirror Sync - One-way directory reconciliation
//!
//! Provides:
//! - The reconciliation engine: one cycle of snapshot, diff, apply, persist
//! - A fixed-interval scheduler with graceful shutdown
//! - The local directory observer (tokio::fs)
//!
//! ## Modules
//!
//! - [`diff`] - Pure set computations over the three snapshots
//! - [`engine`] - [`SyncEngine`](engine::SyncEngine) and the cycle report
//! - [`filesystem`] - `ILocalObserver` adapter for a real directory
//! - [`scheduler`] - Loop driving cycles until cancelled

pub mod diff;
pub mod engine;
pub mod filesystem;
pub mod scheduler;

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while observing the local directory
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while reading the directory
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The watched path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A domain-level error propagated from dirmirror-core
    #[error("Domain error: {0}")]
    DomainError(#[from] dirmirror_core::domain::errors::DomainError),
}
