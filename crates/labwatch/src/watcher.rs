//! One full pass for one location: enumerate, reconcile, sync.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use labwatch_backend::WatchedLocation;
use labwatch_db::LabwatchDb;
use tracing::{debug, info};

use crate::enumerator::Enumerator;
use crate::error::{Result, WatchError};
use crate::paths::resolve_root;
use crate::reconciler::Reconciler;
use crate::sync::SyncStage;
use crate::types::PassReport;

/// Runs passes for a single [`WatchedLocation`].
#[derive(Clone)]
pub struct LocationWatcher {
    location: WatchedLocation,
    enumerator: Enumerator,
    reconciler: Reconciler,
    sync: SyncStage,
}

impl LocationWatcher {
    pub fn new(location: WatchedLocation, db: LabwatchDb, sync: SyncStage) -> Self {
        Self {
            enumerator: Enumerator::for_location(&location),
            reconciler: Reconciler::new(db),
            location,
            sync,
        }
    }

    pub fn location(&self) -> &WatchedLocation {
        &self.location
    }

    /// Run one pass.
    ///
    /// Enumeration errors abort the pass before the store is touched.
    /// Store and backend errors on individual entries are logged and
    /// reported but do not fail the pass.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let root = PathBuf::from(&self.location.folder_path);
        let enumerator = self.enumerator.clone();
        let observed = tokio::task::spawn_blocking(move || {
            let root = resolve_root(&root)?;
            enumerator.enumerate(&root)
        })
        .await
        .map_err(|e| WatchError::PassAborted(format!("enumeration task failed: {e}")))??;

        let (batch, mut stats) = self.reconciler.reconcile(&observed).await;
        let sync = if batch.is_empty() && !self.sync_always() {
            Default::default()
        } else {
            self.sync.forward(&self.location, &batch).await
        };
        stats.duration_ms = timer.elapsed().as_millis() as u64;

        if batch.is_empty() {
            debug!(location = self.location.id, observed = stats.observed, "No changes");
        } else {
            info!(
                location = self.location.id,
                new = stats.new,
                changed = stats.changed,
                registered = sync.registered,
                failures = sync.failures.len(),
                duration_ms = stats.duration_ms,
                "Pass complete"
            );
        }

        Ok(PassReport {
            location_id: self.location.id,
            started_at,
            stats,
            batch,
            sync,
        })
    }

    fn sync_always(&self) -> bool {
        self.sync.resync_unsynced()
    }
}
