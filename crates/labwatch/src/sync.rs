//! Forward change batches to the tracking backend.
//!
//! Remote failures never undo local state: the store has already advanced
//! by the time a batch gets here, and anything the backend rejects keeps
//! `remote_id = 0` until a later pass (or the opt-in resync) retries it.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use labwatch_backend::{NewRemoteFile, RemoteBackend, RemoteFile, WatchedLocation};
use labwatch_db::{LabwatchDb, PersistedEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::enumerator::{is_run_config_name, BUNDLE_SUFFIX};
use crate::paths::{file_name, normalize_path, resolve_root};
use crate::run_config;
use crate::types::ChangeBatch;

/// A single candidate the backend did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub path: String,
    pub error: String,
}

/// What one `forward` call achieved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Files created on the backend
    pub registered: u64,
    /// New files the backend already knew about
    pub matched: u64,
    /// Changed files pushed to the backend
    pub updated: u64,
    /// Ready run configs registered
    pub run_configs: u64,
    /// Candidates dropped by the extension allow-list
    pub filtered: u64,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &str, error: impl ToString) {
        self.failures.push(SyncFailure {
            path: path.to_string(),
            error: error.to_string(),
        });
    }
}

/// Candidates of one batch sorted by what the backend must do with them.
#[derive(Debug, Default)]
struct Plan {
    register: Vec<PersistedEntry>,
    update: Vec<PersistedEntry>,
    run_configs: Vec<String>,
}

/// Pushes change batches to a [`RemoteBackend`] and records remote ids.
#[derive(Clone)]
pub struct SyncStage {
    db: LabwatchDb,
    backend: Arc<dyn RemoteBackend>,
    resync_unsynced: bool,
}

impl SyncStage {
    pub fn new(db: LabwatchDb, backend: Arc<dyn RemoteBackend>) -> Self {
        Self {
            db,
            backend,
            resync_unsynced: false,
        }
    }

    /// Also forward stored entries under the root that still have no remote id.
    pub fn with_resync_unsynced(mut self, enabled: bool) -> Self {
        self.resync_unsynced = enabled;
        self
    }

    pub fn resync_unsynced(&self) -> bool {
        self.resync_unsynced
    }

    /// Forward one batch. Never fails; problems end up in the report.
    pub async fn forward(&self, location: &WatchedLocation, batch: &ChangeBatch) -> SyncReport {
        let mut report = SyncReport::default();
        let mut plan = Plan::default();

        for entry in &batch.new {
            self.route(location, entry, &mut plan, &mut report);
        }
        for entry in &batch.changed {
            self.route(location, entry, &mut plan, &mut report);
        }
        if self.resync_unsynced {
            self.add_unsynced(location, &mut plan, &mut report).await;
        }

        if !plan.register.is_empty() {
            self.register_files(location, &plan.register, &mut report).await;
        }
        if !plan.update.is_empty() {
            self.update_files(location, &plan.update, &mut report).await;
        }
        for path in &plan.run_configs {
            match run_config::register_if_ready(self.backend.as_ref(), location, path).await {
                Ok(Some(_)) => report.run_configs += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(location = location.id, path = %path, error = %e, "Run config not registered");
                    report.fail(path, e);
                }
            }
        }

        if !report.is_clean() {
            warn!(
                location = location.id,
                failures = report.failures.len(),
                "Sync finished with failures"
            );
        }
        report
    }

    fn route(
        &self,
        location: &WatchedLocation,
        entry: &PersistedEntry,
        plan: &mut Plan,
        report: &mut SyncReport,
    ) {
        let name = file_name(&entry.path);
        if is_run_config_name(name) {
            plan.run_configs.push(entry.path.clone());
        } else if !extension_allowed(location, entry, name) {
            report.filtered += 1;
        } else if entry.is_synced() {
            plan.update.push(entry.clone());
        } else {
            plan.register.push(entry.clone());
        }
    }

    async fn add_unsynced(
        &self,
        location: &WatchedLocation,
        plan: &mut Plan,
        report: &mut SyncReport,
    ) {
        let root = match resolve_root(Path::new(&location.folder_path)) {
            Ok(root) => normalize_path(&root),
            Err(e) => {
                report.fail(&location.folder_path, e);
                return;
            }
        };
        let pending = match self.db.list_unsynced(&root).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(location = location.id, error = %e, "Could not list unsynced entries");
                report.fail(&root, e);
                return;
            }
        };

        let queued: HashSet<String> = plan.register.iter().map(|e| e.path.clone()).collect();
        for entry in pending {
            if queued.contains(&entry.path) {
                continue;
            }
            let name = file_name(&entry.path);
            if is_run_config_name(name) || !extension_allowed(location, &entry, name) {
                continue;
            }
            debug!(path = %entry.path, "Retrying unsynced entry");
            plan.register.push(entry);
        }
    }

    async fn register_files(
        &self,
        location: &WatchedLocation,
        entries: &[PersistedEntry],
        report: &mut SyncReport,
    ) {
        let paths: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
        let known: HashMap<String, i64> = match self.backend.get_files_by_path(&paths).await {
            Ok(files) => files.into_iter().map(|f| (f.file_path, f.id)).collect(),
            Err(e) => {
                warn!(location = location.id, error = %e, "Path lookup failed, registering individually");
                HashMap::new()
            }
        };

        for entry in entries {
            let remote_id = match known.get(&entry.path) {
                Some(id) => {
                    report.matched += 1;
                    *id
                }
                None => {
                    let candidate = NewRemoteFile {
                        file_path: entry.path.clone(),
                        folder_watching_location: location.id,
                        size: entry.size,
                    };
                    match self.backend.create_file(&candidate).await {
                        Ok(created) => {
                            report.registered += 1;
                            created.id
                        }
                        Err(e) => {
                            warn!(path = %entry.path, error = %e, "Failed to register file");
                            report.fail(&entry.path, e);
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = self.db.set_remote_id(&entry.path, remote_id).await {
                warn!(path = %entry.path, error = %e, "Failed to record remote id");
                report.fail(&entry.path, e);
            }
        }

        info!(
            location = location.id,
            registered = report.registered,
            matched = report.matched,
            "Registered new files"
        );
    }

    async fn update_files(
        &self,
        location: &WatchedLocation,
        entries: &[PersistedEntry],
        report: &mut SyncReport,
    ) {
        let files: Vec<RemoteFile> = entries
            .iter()
            .map(|e| RemoteFile {
                id: e.remote_id,
                file_path: e.path.clone(),
                folder_watching_location: location.id,
                size: e.size,
                experiment: None,
                processing: false,
                ready_for_processing: false,
            })
            .collect();

        match self.backend.update_files(&files).await {
            Ok(_) => {
                report.updated += files.len() as u64;
                info!(location = location.id, updated = files.len(), "Updated changed files");
            }
            Err(e) => {
                warn!(location = location.id, error = %e, "Failed to update changed files");
                for file in &files {
                    report.fail(&file.file_path, &e);
                }
            }
        }
    }
}

fn extension_allowed(location: &WatchedLocation, entry: &PersistedEntry, name: &str) -> bool {
    if entry.is_bundle {
        let allowed = location.allowed_extensions();
        allowed.is_empty() || allowed.iter().any(|ext| ext == BUNDLE_SUFFIX)
    } else {
        location.allows_extension(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(extensions: &str) -> WatchedLocation {
        WatchedLocation {
            id: 1,
            folder_path: "/data".to_string(),
            extensions: extensions.to_string(),
            ignore_term: String::new(),
            network_folder: false,
        }
    }

    fn entry(path: &str, is_bundle: bool) -> PersistedEntry {
        PersistedEntry::unsynced(path, 1, is_bundle, 1)
    }

    #[test]
    fn test_bundles_match_on_bundle_suffix() {
        let bundle = entry("/data/run01.d", true);
        assert!(extension_allowed(&location(".raw,.d"), &bundle, "run01.d"));
        assert!(!extension_allowed(&location(".raw"), &bundle, "run01.d"));
        assert!(extension_allowed(&location(""), &bundle, "run01.d"));
    }

    #[test]
    fn test_files_match_on_extension() {
        let file = entry("/data/a.mzML", false);
        assert!(extension_allowed(&location(".mzML"), &file, "a.mzML"));
        assert!(!extension_allowed(&location(".raw"), &file, "a.mzML"));
    }

    #[test]
    fn test_report_failures() {
        let mut report = SyncReport::default();
        assert!(report.is_clean());
        report.fail("/data/a", "boom");
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].error, "boom");
    }
}
