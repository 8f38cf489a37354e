//! Schema creation for the state store.

use crate::error::Result;
use crate::LabwatchDb;
use tracing::debug;

impl LabwatchDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // One row per observed path; remote_id 0 = not yet synced
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                is_bundle BOOLEAN NOT NULL DEFAULT 0,
                last_modified INTEGER NOT NULL,
                remote_id INTEGER NOT NULL DEFAULT 0
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_remote_id ON files(remote_id)")
            .execute(&self.pool)
            .await?;

        debug!("Database schema verified");
        Ok(())
    }
}
