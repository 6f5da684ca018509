//! dirmirror Ledger - Durable record of synchronized files
//!
//! SQLite-backed storage for the `filename → last-sync-instant` mapping the
//! reconciliation engine reads at the start of every cycle and rewrites at
//! the end of it.
//!
//! ## Architecture
//!
//! This crate implements the `ILedgerStore` port from `dirmirror-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`LedgerDatabase`] - Exclusive handle on the ledger file, with schema setup
//! - [`SqliteLedgerStore`] - `ILedgerStore` implementation with
//!   transactional change-set commits
//! - [`LedgerError`] - Error types for ledger operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use dirmirror_ledger::{LedgerDatabase, SqliteLedgerStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let db = LedgerDatabase::open(Path::new("/home/user/.local/share/dirmirror/ledger.db")).await?;
//! let store = SqliteLedgerStore::new(db.pool().clone());
//! // Use store as ILedgerStore...
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod repository;

pub use database::LedgerDatabase;
pub use repository::SqliteLedgerStore;

/// Errors that can occur during ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::QueryFailed(e.to_string())
    }
}
