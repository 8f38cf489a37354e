//! Filesystem enumeration for one watch root.
//!
//! The walk is a point-in-time snapshot: every regular file becomes one
//! [`ObservedEntry`], and every directory whose name ends in `.d` becomes a
//! single bundle entry whose size and mtime are aggregated from its contents.
//! Any read or stat error aborts the whole enumeration so that a partial view
//! of the tree never reaches the store.

use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, Utc};
use labwatch_backend::WatchedLocation;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::paths::{normalize_path, validate_root};
use crate::types::ObservedEntry;

/// Directory suffix marking an instrument bundle.
pub const BUNDLE_SUFFIX: &str = ".d";

/// File suffixes marking run-config files; these bypass the ignore filter.
pub const RUN_CONFIG_SUFFIXES: &[&str] = &[".cat.yml", ".cat.yaml"];

pub fn is_bundle_name(name: &str) -> bool {
    name.len() > BUNDLE_SUFFIX.len() && name.to_lowercase().ends_with(BUNDLE_SUFFIX)
}

pub fn is_run_config_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    RUN_CONFIG_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Walks a root and produces the current set of entries.
#[derive(Debug, Clone, Default)]
pub struct Enumerator {
    ignore_term: String,
}

impl Enumerator {
    /// An empty `ignore_term` disables the ignore filter.
    pub fn new(ignore_term: impl Into<String>) -> Self {
        Self {
            ignore_term: ignore_term.into(),
        }
    }

    pub fn for_location(location: &WatchedLocation) -> Self {
        Self::new(location.ignore_term.clone())
    }

    /// Whether an entry with this name is skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        !self.ignore_term.is_empty()
            && name.contains(self.ignore_term.as_str())
            && !is_run_config_name(name)
    }

    /// Enumerate `root`. Fails on a missing root or any unreadable sub-path.
    pub fn enumerate(&self, root: &Path) -> Result<Vec<ObservedEntry>> {
        validate_root(root)?;

        let mut entries = Vec::new();
        let mut walker = WalkDir::new(root).follow_links(false).min_depth(1).into_iter();

        while let Some(next) = walker.next() {
            let entry = next?;
            let file_type = entry.file_type();
            let name = entry.file_name().to_string_lossy();

            if file_type.is_dir() {
                if !is_bundle_name(&name) {
                    continue;
                }
                walker.skip_current_dir();
                if self.is_ignored(&name) {
                    continue;
                }
                let (size, last_modified) = aggregate_bundle(entry.path())?;
                entries.push(ObservedEntry {
                    path: normalize_path(entry.path()),
                    size,
                    last_modified,
                    is_bundle: true,
                });
                continue;
            }

            // Symlinks are not followed and not reported.
            if !file_type.is_file() || self.is_ignored(&name) {
                continue;
            }

            let metadata = entry.metadata()?;
            entries.push(ObservedEntry {
                path: normalize_path(entry.path()),
                size: metadata.len(),
                last_modified: modified_secs(&metadata)?,
                is_bundle: false,
            });
        }

        debug!(root = %root.display(), entries = entries.len(), "Enumeration complete");
        Ok(entries)
    }
}

/// Total size and newest mtime of the regular files under a bundle.
///
/// An empty bundle has size 0 and mtime 0; the directory's own mtime is
/// never used.
pub fn aggregate_bundle(dir: &Path) -> Result<(u64, i64)> {
    let mut total = 0u64;
    let mut newest = 0i64;
    for entry in WalkDir::new(dir).follow_links(false).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata()?;
        total += metadata.len();
        newest = newest.max(modified_secs(&metadata)?);
    }
    Ok((total, newest))
}

fn modified_secs(metadata: &Metadata) -> Result<i64> {
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(modified.timestamp())
}
