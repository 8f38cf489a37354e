//! Watch-root path handling and path identity.

use std::path::{Path, PathBuf};

use crate::error::{Result, WatchError};

/// Canonical string form of a path, used as the store key.
///
/// Separators become `/`. Hosts with case-insensitive filesystems
/// (Windows, macOS) fold to lower case so one file never has two keys.
pub fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let raw = raw.strip_prefix(r"\\?\").unwrap_or(&*raw);
    let slashed = raw.replace('\\', "/");
    if cfg!(any(windows, target_os = "macos")) {
        slashed.to_lowercase()
    } else {
        slashed
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_root(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(path));
        }
    }
    path.to_path_buf()
}

/// Check that a watch root exists and is a directory.
pub fn validate_root(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(WatchError::RootMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(WatchError::NotDirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Expand, validate and canonicalize a configured root.
pub fn resolve_root(path: &Path) -> Result<PathBuf> {
    let expanded = expand_root(path);
    validate_root(&expanded)?;
    Ok(expanded.canonicalize()?)
}

/// Last component of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent directory of a normalized path; `None` for a bare name.
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    if parent.is_empty() {
        Some("/")
    } else {
        Some(parent)
    }
}
