//! Ledger database handle
//!
//! One daemon owns one ledger file. The handle keeps a single SQLite
//! connection open for its whole lifetime in exclusive locking mode, so a
//! second daemon pointed at the same file fails at startup instead of
//! interleaving cycles with the first one.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqliteLockingMode, SqlitePool, SqlitePoolOptions,
};

use crate::LedgerError;

/// How long a second opener waits for the lock before giving up
const LOCK_WAIT: Duration = Duration::from_millis(250);

/// Exclusive handle on a ledger database
///
/// Backed by a pool of exactly one connection that never idles out, so the
/// file lock taken at open is held until [`LedgerDatabase::close`] or drop.
pub struct LedgerDatabase {
    pool: SqlitePool,
}

impl LedgerDatabase {
    /// Opens (creating if needed) the ledger file and takes ownership of it
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ConnectionFailed` if the file cannot be created
    /// or is held by another process, or `LedgerError::MigrationFailed` if the
    /// schema cannot be applied.
    pub async fn open(db_path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .locking_mode(SqliteLockingMode::Exclusive)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(LOCK_WAIT);

        let pool = single_connection()
            .connect_with(options)
            .await
            .map_err(|e| {
                LedgerError::ConnectionFailed(format!(
                    "Failed to open ledger at {} (is another dirmirrord using it?): {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::migrate(&pool).await.map_err(|e| match e {
            LedgerError::MigrationFailed(msg) if msg.contains("locked") => {
                LedgerError::ConnectionFailed(format!(
                    "Ledger {} is in use by another process: {}",
                    db_path.display(),
                    msg
                ))
            }
            other => other,
        })?;

        tracing::info!(path = %db_path.display(), "Ledger database opened");

        Ok(Self { pool })
    }

    /// Opens a private in-memory ledger
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ConnectionFailed` or `LedgerError::MigrationFailed`.
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let pool = single_connection()
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                LedgerError::ConnectionFailed(format!("Failed to create in-memory ledger: {}", e))
            })?;

        Self::migrate(&pool).await?;

        tracing::debug!("In-memory ledger opened");

        Ok(Self { pool })
    }

    /// Returns the connection pool backing this ledger
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection and releases the file lock
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Creates the schema under an exclusive transaction
    ///
    /// In exclusive locking mode the lock taken here outlives the commit.
    async fn migrate(pool: &SqlitePool) -> Result<(), LedgerError> {
        let migration = format!(
            "BEGIN EXCLUSIVE;\n{}\nCOMMIT;",
            include_str!("migrations/0001_ledger.sql")
        );
        sqlx::raw_sql(&migration)
            .execute(pool)
            .await
            .map_err(|e| LedgerError::MigrationFailed(e.to_string()))?;

        tracing::debug!("Ledger schema ready");
        Ok(())
    }
}

/// One connection, held open for the lifetime of the handle
fn single_connection() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}
