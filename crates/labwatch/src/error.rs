//! Error types for the watcher

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Watcher error type
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Store error: {0}")]
    Database(#[from] labwatch_db::DbError),

    #[error("Backend error: {0}")]
    Backend(#[from] labwatch_backend::BackendError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Watch root not found: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("Watch root is not a directory: {}", .0.display())]
    NotDirectory(PathBuf),

    #[error("Scan pass aborted: {0}")]
    PassAborted(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WatchError>;
