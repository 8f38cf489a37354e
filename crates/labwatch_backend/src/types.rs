//! Wire types exchanged with the tracking backend.

use serde::{Deserialize, Serialize};

/// A configured root directory plus its filters.
///
/// One scheduler loop runs per location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedLocation {
    /// Backend id
    #[serde(default)]
    pub id: i64,
    /// Root directory to watch
    pub folder_path: String,
    /// Comma separated extension allow-list, e.g. ".mzML,.yml,.yaml"
    #[serde(default)]
    pub extensions: String,
    /// Entries whose name contains this substring are skipped
    #[serde(default)]
    pub ignore_term: String,
    /// Root lives on a network share
    #[serde(default)]
    pub network_folder: bool,
}

impl WatchedLocation {
    /// Parsed extension allow-list; empty means everything is allowed.
    ///
    /// Entries are trimmed, lower-cased and given a leading dot.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect()
    }

    /// True when `name` passes the extension allow-list.
    pub fn allows_extension(&self, name: &str) -> bool {
        let allowed = self.allowed_extensions();
        if allowed.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        allowed.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// A file record on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: i64,
    pub file_path: String,
    #[serde(default)]
    pub folder_watching_location: i64,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<i64>,
    #[serde(default)]
    pub processing: bool,
    #[serde(default)]
    pub ready_for_processing: bool,
}

/// Payload for registering a new file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRemoteFile {
    pub file_path: String,
    pub folder_watching_location: i64,
    pub size: u64,
}

/// An experiment grouping files and run configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteExperiment {
    pub id: i64,
    pub experiment_name: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub sample_count: i64,
}

/// Payload for registering a run config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRunConfig {
    pub config_file_path: String,
    pub folder_watching_location: i64,
    pub experiment: i64,
    pub content: serde_json::Value,
}

/// A run config record on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRunConfig {
    pub id: i64,
    pub config_file_path: String,
    #[serde(default)]
    pub folder_watching_location: i64,
    #[serde(default)]
    pub experiment: i64,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub fasta_ready: bool,
    #[serde(default)]
    pub fasta_required: bool,
    #[serde(default)]
    pub spectral_library_ready: bool,
    #[serde(default)]
    pub spectral_library_required: bool,
}
