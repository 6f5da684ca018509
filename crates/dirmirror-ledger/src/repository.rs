//! SQLite implementation of ILedgerStore
//!
//! ## Type Mapping
//!
//! | Domain Type   | Column     | Strategy                                   |
//! |---------------|------------|--------------------------------------------|
//! | FileName      | `filename` | String via `.as_str()` / `FileName::new()` |
//! | SyncInstant   | `datetime` | String via `.as_str()` / `SyncInstant::parse()` |
//!
//! Rows that no longer parse do not fail the read. A bad `datetime` reads as
//! [`SyncInstant::earliest`], so the engine overwrites the file (or prunes the
//! row if the file is gone) and the next commit repairs it. A bad `filename`
//! cannot match any watched file and is deleted.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use dirmirror_core::domain::{FileName, LedgerChangeSet, LedgerSnapshot, SyncInstant};
use dirmirror_core::ports::ILedgerStore;

use crate::LedgerError;

const UPSERT_SQL: &str = "INSERT INTO files (filename, datetime) VALUES (?, ?) \
     ON CONFLICT(filename) DO UPDATE SET datetime = excluded.datetime";

const DELETE_SQL: &str = "DELETE FROM files WHERE filename = ?";

/// SQLite-based implementation of the ledger store port
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Applies a change set inside one transaction
    ///
    /// Any early return drops `tx` uncommitted, which rolls it back.
    async fn commit_changes(&self, changes: &LedgerChangeSet) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        for (name, instant) in changes.upserts() {
            sqlx::query(UPSERT_SQL)
                .bind(name.as_str())
                .bind(instant.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for name in changes.deletions() {
            sqlx::query(DELETE_SQL)
                .bind(name.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// A `files` row as read back from disk
enum StoredRow {
    Valid(FileName, SyncInstant),
    /// The name is usable but the instant is not
    BadInstant(FileName, String),
    /// The name cannot belong to a watched file
    BadName(String),
}

/// Classifies a `files` row
fn classify_row(row: &SqliteRow) -> Result<StoredRow, LedgerError> {
    let filename: String = row.try_get("filename")?;
    let datetime: String = row.try_get("datetime")?;

    let Ok(name) = FileName::new(filename.clone()) else {
        return Ok(StoredRow::BadName(filename));
    };
    Ok(match SyncInstant::parse(datetime.clone()) {
        Ok(instant) => StoredRow::Valid(name, instant),
        Err(_) => StoredRow::BadInstant(name, datetime),
    })
}

// ============================================================================
// ILedgerStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILedgerStore for SqliteLedgerStore {
    async fn read_all(&self) -> anyhow::Result<LedgerSnapshot> {
        let rows = sqlx::query("SELECT filename, datetime FROM files ORDER BY filename")
            .fetch_all(&self.pool)
            .await?;

        let mut snapshot = LedgerSnapshot::new();
        for row in &rows {
            match classify_row(row)? {
                StoredRow::Valid(name, instant) => {
                    snapshot.insert(name, instant);
                }
                StoredRow::BadInstant(name, raw) => {
                    tracing::warn!(
                        file = %name,
                        datetime = %raw,
                        "Unreadable sync instant in ledger, file will be uploaded again"
                    );
                    snapshot.insert(name, SyncInstant::earliest());
                }
                StoredRow::BadName(raw) => {
                    tracing::warn!(filename = %raw, "Dropping ledger row with invalid file name");
                    sqlx::query(DELETE_SQL)
                        .bind(&raw)
                        .execute(&self.pool)
                        .await?;
                }
            }
        }

        tracing::trace!(entries = snapshot.len(), "Read ledger");
        Ok(snapshot)
    }

    async fn upsert(&self, name: &FileName, instant: &SyncInstant) -> anyhow::Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(name.as_str())
            .bind(instant.as_str())
            .execute(&self.pool)
            .await?;

        tracing::trace!(file = %name, instant = %instant, "Upserted ledger entry");
        Ok(())
    }

    async fn delete(&self, name: &FileName) -> anyhow::Result<()> {
        sqlx::query(DELETE_SQL)
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;

        tracing::trace!(file = %name, "Deleted ledger entry");
        Ok(())
    }

    async fn commit(&self, changes: &LedgerChangeSet) -> anyhow::Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        self.commit_changes(changes).await?;

        tracing::debug!(
            upserts = changes.upserts().len(),
            deletions = changes.deletions().len(),
            "Committed ledger changes"
        );
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count)?)
    }
}
