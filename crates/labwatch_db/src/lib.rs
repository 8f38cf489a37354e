//! Persisted state store for labwatch
//!
//! Durable record of every path the watcher has ever observed, keyed by
//! normalized path. Every call goes straight to SQLite; there is no cache,
//! so each scan pass re-reads truth from disk and a crash mid-pass leaves
//! only fully committed work behind.
//!
//! # Usage
//!
//! ```rust,ignore
//! use labwatch_db::{LabwatchDb, PersistedEntry};
//!
//! let db = LabwatchDb::open("/var/lib/labwatch/labwatch.sqlite3").await?;
//! if !db.exists("/data/run1.raw").await? {
//!     db.insert(&PersistedEntry::unsynced("/data/run1.raw", 42, false, 1_700_000_000)).await?;
//! }
//! ```

mod entries;
mod error;
mod schema;
mod types;

pub use error::{DbError, Result};
pub use types::*;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the state store.
///
/// Cheap to clone; all clones share one connection pool. Concurrent writers
/// are serialized by SQLite transactions.
#[derive(Clone, Debug)]
pub struct LabwatchDb {
    pool: SqlitePool,
}

impl LabwatchDb {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directory and all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "State store opened");

        Ok(db)
    }

    /// Open a private in-memory database (for testing).
    ///
    /// Pinned to a single connection that is never recycled, since every
    /// SQLite memory connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Get the underlying connection pool (escape hatch for tests and tools).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("state.sqlite3");

        let db = LabwatchDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        let name: String = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'files'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(name, "files");

        db.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("state.sqlite3");

        let db = LabwatchDb::open(&db_path).await.unwrap();
        db.insert(&PersistedEntry::unsynced("/data/a.raw", 1, false, 10))
            .await
            .unwrap();
        db.close().await;

        let db = LabwatchDb::open(&db_path).await.unwrap();
        assert!(db.exists("/data/a.raw").await.unwrap());
        db.close().await;
    }
}
