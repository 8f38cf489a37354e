//! Entry operations (exists / get / insert / update / batch update)

use crate::error::{DbError, Result};
use crate::types::{PersistedEntry, UNSYNCED_REMOTE_ID};
use crate::LabwatchDb;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::Row;

impl LabwatchDb {
    /// Check whether a record exists for `path`.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Fetch the record for `path`.
    pub async fn get(&self, path: &str) -> Result<PersistedEntry> {
        let row = sqlx::query(
            "SELECT path, size, is_bundle, last_modified, remote_id FROM files WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_entry(&row),
            None => Err(DbError::not_found(path)),
        }
    }

    /// Insert a new record.
    ///
    /// Strict insert: an existing path is a [`DbError::DuplicateKey`], never
    /// an overwrite, so a stored remote id cannot be clobbered.
    pub async fn insert(&self, entry: &PersistedEntry) -> Result<()> {
        let size = size_to_db(entry)?;
        let result = sqlx::query(
            r#"
            INSERT INTO files (path, size, is_bundle, last_modified, remote_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.path)
        .bind(size)
        .bind(entry.is_bundle)
        .bind(entry.last_modified)
        .bind(entry.remote_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(DbError::duplicate_key(&entry.path))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrite an existing record.
    pub async fn update(&self, entry: &PersistedEntry) -> Result<()> {
        update_entry(&self.pool, entry).await
    }

    /// Apply all updates in one transaction.
    ///
    /// If any update fails the transaction is rolled back and the error is
    /// returned; no entry of the batch is persisted.
    pub async fn update_batch(&self, entries: &[PersistedEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            if let Err(err) = update_entry(&mut *tx, entry).await {
                tx.rollback().await?;
                return Err(err);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Record the backend id assigned to `path`.
    pub async fn set_remote_id(&self, path: &str, remote_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE files SET remote_id = ? WHERE path = ?")
            .bind(remote_id)
            .bind(path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(path));
        }
        Ok(())
    }

    /// List records under `root` that the backend has not confirmed yet.
    pub async fn list_unsynced(&self, root: &str) -> Result<Vec<PersistedEntry>> {
        let prefix = format!("{}/", root.trim_end_matches('/'));
        let rows = sqlx::query(
            r#"
            SELECT path, size, is_bundle, last_modified, remote_id FROM files
            WHERE remote_id = ?1 AND substr(path, 1, length(?2)) = ?2
            ORDER BY path
            "#,
        )
        .bind(UNSYNCED_REMOTE_ID)
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

async fn update_entry<'e, E>(executor: E, entry: &PersistedEntry) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let size = size_to_db(entry)?;
    let result = sqlx::query(
        r#"
        UPDATE files
        SET size = ?, is_bundle = ?, last_modified = ?, remote_id = ?
        WHERE path = ?
        "#,
    )
    .bind(size)
    .bind(entry.is_bundle)
    .bind(entry.last_modified)
    .bind(entry.remote_id)
    .bind(&entry.path)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(&entry.path));
    }
    Ok(())
}

fn size_to_db(entry: &PersistedEntry) -> Result<i64> {
    i64::try_from(entry.size).map_err(|_| {
        DbError::InvalidValue(format!("size {} of {} exceeds i64", entry.size, entry.path))
    })
}

fn row_to_entry(row: &SqliteRow) -> Result<PersistedEntry> {
    let size: i64 = row.try_get("size")?;
    Ok(PersistedEntry {
        path: row.try_get("path")?,
        size: u64::try_from(size)
            .map_err(|_| DbError::InvalidValue(format!("negative size {size}")))?,
        is_bundle: row.try_get("is_bundle")?,
        last_modified: row.try_get("last_modified")?,
        remote_id: row.try_get("remote_id")?,
    })
}
