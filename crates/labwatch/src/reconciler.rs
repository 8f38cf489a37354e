//! Diff an enumeration against the store.

use labwatch_db::{DbError, LabwatchDb, PersistedEntry};
use tracing::{debug, warn};

use crate::types::{ChangeBatch, ObservedEntry, ScanStats};

/// How one observed entry compares to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    New(PersistedEntry),
    Changed(PersistedEntry),
    Unchanged,
}

/// Classifies observed entries and advances the store to match them.
#[derive(Debug, Clone)]
pub struct Reconciler {
    db: LabwatchDb,
}

impl Reconciler {
    pub fn new(db: LabwatchDb) -> Self {
        Self { db }
    }

    /// Reconcile one pass worth of entries.
    ///
    /// A store failure on one entry is logged and that entry is left out of
    /// the batch; the rest are still processed. Paths in the store that were
    /// not observed are left alone.
    pub async fn reconcile(&self, observed: &[ObservedEntry]) -> (ChangeBatch, ScanStats) {
        let mut batch = ChangeBatch::default();
        let mut stats = ScanStats {
            observed: observed.len() as u64,
            ..Default::default()
        };

        for entry in observed {
            match self.classify(entry).await {
                Ok(Classification::New(record)) => {
                    stats.new += 1;
                    batch.new.push(record);
                }
                Ok(Classification::Changed(record)) => {
                    stats.changed += 1;
                    batch.changed.push(record);
                }
                Ok(Classification::Unchanged) => stats.unchanged += 1,
                Err(e) => {
                    stats.errors += 1;
                    warn!(path = %entry.path, error = %e, "Skipping entry after store error");
                }
            }
        }

        debug!(
            new = stats.new,
            changed = stats.changed,
            unchanged = stats.unchanged,
            errors = stats.errors,
            "Reconciled entries"
        );
        (batch, stats)
    }

    /// Classify a single entry, writing the store when it is new or changed.
    pub async fn classify(&self, entry: &ObservedEntry) -> Result<Classification, DbError> {
        if !self.db.exists(&entry.path).await? {
            let record = entry.to_persisted();
            self.db.insert(&record).await?;
            return Ok(Classification::New(record));
        }

        let stored = self.db.get(&entry.path).await?;
        if !entry.differs_from(&stored) {
            return Ok(Classification::Unchanged);
        }

        let record = PersistedEntry {
            size: entry.size,
            last_modified: entry.last_modified,
            is_bundle: entry.is_bundle,
            ..stored
        };
        self.db.update(&record).await?;
        Ok(Classification::Changed(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(path: &str, size: u64, mtime: i64) -> ObservedEntry {
        ObservedEntry {
            path: path.to_string(),
            size,
            last_modified: mtime,
            is_bundle: false,
        }
    }

    async fn reconciler() -> (LabwatchDb, Reconciler) {
        let db = LabwatchDb::open_in_memory().await.unwrap();
        (db.clone(), Reconciler::new(db))
    }

    #[tokio::test]
    async fn test_new_entry_is_inserted_once() {
        let (db, reconciler) = reconciler().await;
        let entries = vec![observed("/r/a.raw", 10, 100)];

        let (batch, stats) = reconciler.reconcile(&entries).await;
        assert_eq!(batch.new.len(), 1);
        assert_eq!(stats.new, 1);
        assert!(db.exists("/r/a.raw").await.unwrap());

        let (batch, stats) = reconciler.reconcile(&entries).await;
        assert!(batch.is_empty());
        assert_eq!(stats.unchanged, 1);
    }

    #[tokio::test]
    async fn test_change_detection_variants() {
        let (db, reconciler) = reconciler().await;
        reconciler
            .reconcile(&[
                observed("/r/size", 1, 100),
                observed("/r/mtime", 1, 100),
                observed("/r/both", 1, 100),
                observed("/r/same", 1, 100),
            ])
            .await;

        let (batch, _) = reconciler
            .reconcile(&[
                observed("/r/size", 2, 100),
                observed("/r/mtime", 1, 200),
                observed("/r/both", 2, 200),
                observed("/r/same", 1, 100),
            ])
            .await;

        let mut changed: Vec<_> = batch.changed.iter().map(|e| e.path.as_str()).collect();
        changed.sort();
        assert_eq!(changed, vec!["/r/both", "/r/mtime", "/r/size"]);
        assert!(batch.new.is_empty());
        assert_eq!(db.get("/r/both").await.unwrap().size, 2);
    }

    #[tokio::test]
    async fn test_change_preserves_remote_id() {
        let (db, reconciler) = reconciler().await;
        reconciler.reconcile(&[observed("/r/a", 1, 1)]).await;
        db.set_remote_id("/r/a", 77).await.unwrap();

        let (batch, _) = reconciler.reconcile(&[observed("/r/a", 5, 1)]).await;
        assert_eq!(batch.changed[0].remote_id, 77);
        assert_eq!(db.get("/r/a").await.unwrap().remote_id, 77);
    }

    #[tokio::test]
    async fn test_missing_paths_are_invisible() {
        let (db, reconciler) = reconciler().await;
        reconciler
            .reconcile(&[observed("/r/a", 1, 1), observed("/r/b", 1, 1)])
            .await;

        let (batch, stats) = reconciler.reconcile(&[observed("/r/a", 1, 1)]).await;
        assert!(batch.is_empty());
        assert_eq!(stats.observed, 1);
        assert!(db.exists("/r/b").await.unwrap());
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_error_skips_only_that_entry() {
        let (db, reconciler) = reconciler().await;
        // A trigger that rejects one path makes its insert fail.
        sqlx::query(
            "CREATE TRIGGER reject_bad BEFORE INSERT ON files
             WHEN NEW.path = '/r/bad'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let (batch, stats) = reconciler
            .reconcile(&[
                observed("/r/a", 1, 1),
                observed("/r/bad", 1, 1),
                observed("/r/c", 1, 1),
            ])
            .await;

        assert_eq!(stats.errors, 1);
        assert_eq!(batch.new.len(), 2);
        assert!(db.exists("/r/a").await.unwrap());
        assert!(!db.exists("/r/bad").await.unwrap());
        assert!(db.exists("/r/c").await.unwrap());
    }
}
