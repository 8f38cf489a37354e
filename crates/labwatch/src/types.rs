//! Core types for a reconciliation pass

use chrono::{DateTime, Utc};
use labwatch_db::PersistedEntry;
use serde::{Deserialize, Serialize};

/// One file or bundle seen by the enumerator in the current pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEntry {
    /// Normalized absolute path
    pub path: String,
    /// Logical size in bytes (recursive sum for bundles)
    pub size: u64,
    /// Last modification, unix seconds
    pub last_modified: i64,
    /// Bundle directory reported as a single file
    pub is_bundle: bool,
}

impl ObservedEntry {
    /// Fresh store record for a first sighting.
    pub fn to_persisted(&self) -> PersistedEntry {
        PersistedEntry::unsynced(
            self.path.clone(),
            self.size,
            self.is_bundle,
            self.last_modified,
        )
    }

    /// True when size or mtime differ from the stored record.
    pub fn differs_from(&self, stored: &PersistedEntry) -> bool {
        self.size != stored.size || self.last_modified != stored.last_modified
    }
}

/// New and changed entries from one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub new: Vec<PersistedEntry>,
    pub changed: Vec<PersistedEntry>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.changed.len()
    }
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Entries produced by the enumerator
    pub observed: u64,
    /// First sightings
    pub new: u64,
    /// Size or mtime moved
    pub changed: u64,
    pub unchanged: u64,
    /// Entries skipped after a store error
    pub errors: u64,
    pub duration_ms: u64,
}

/// Outcome of one complete pass for a location.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub location_id: i64,
    pub started_at: DateTime<Utc>,
    pub stats: ScanStats,
    pub batch: ChangeBatch,
    pub sync: crate::sync::SyncReport,
}
