//! Row types stored by labwatch.

use serde::{Deserialize, Serialize};

/// Remote id value for entries the backend has not confirmed yet.
pub const UNSYNCED_REMOTE_ID: i64 = 0;

/// Durable record of an observed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// Normalized absolute path (primary key)
    pub path: String,
    /// Logical size in bytes (aggregate for bundles)
    pub size: u64,
    /// Whether this entry is a bundle directory treated as one file
    pub is_bundle: bool,
    /// Last modification time, unix seconds
    pub last_modified: i64,
    /// Backend id, [`UNSYNCED_REMOTE_ID`] until the backend confirms creation
    pub remote_id: i64,
}

impl PersistedEntry {
    /// A fresh record that has never been synced.
    pub fn unsynced(path: impl Into<String>, size: u64, is_bundle: bool, last_modified: i64) -> Self {
        Self {
            path: path.into(),
            size,
            is_bundle,
            last_modified,
            remote_id: UNSYNCED_REMOTE_ID,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id != UNSYNCED_REMOTE_ID
    }
}
