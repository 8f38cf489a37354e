//! Configuration for the watcher

use labwatch_backend::WatchedLocation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration, loaded from TOML and overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the SQLite state store
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Base URL of the tracking backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// API token sent as `Authorization: Token <token>`
    #[serde(default)]
    pub token: String,

    /// Seconds between passes for each location
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Also forward stored entries whose remote id is still 0
    #[serde(default)]
    pub resync_unsynced: bool,

    /// Static locations; when non-empty the backend's list is not fetched
    #[serde(default)]
    pub locations: Vec<WatchedLocation>,
}

fn default_database_path() -> String {
    dirs::home_dir()
        .map(|h| h.join(".labwatch").join("labwatch.sqlite3"))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "labwatch.sqlite3".to_string())
}

fn default_backend_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_scan_interval() -> u64 {
    60
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            backend_url: default_backend_url(),
            token: String::new(),
            scan_interval_secs: default_scan_interval(),
            resync_unsynced: false,
            locations: Vec::new(),
        }
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WatchConfig =
            toml::from_str(&content).map_err(|e| crate::WatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::WatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(crate::WatchError::Config(
                "scan_interval_secs must be at least 1".to_string(),
            ));
        }
        if let Some(loc) = self.locations.iter().find(|l| l.folder_path.trim().is_empty()) {
            return Err(crate::WatchError::Config(format!(
                "location {} has an empty folder_path",
                loc.id
            )));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}
