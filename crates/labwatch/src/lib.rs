//! labwatch: polling watcher for instrument output folders.
//!
//! Each watched location is walked on a fixed interval; what is found is
//! diffed against a local SQLite store and the new and changed entries are
//! forwarded to the tracking backend.
//!
//! # Modules
//!
//! - [`enumerator`] - walks a root, folding `.d` bundles into single entries
//! - [`reconciler`] - classifies entries as new/changed/unchanged against the store
//! - [`sync`] - forwards change batches to the backend and records remote ids
//! - [`run_config`] - registers `*.cat.yml` run configs once they are ready
//! - [`watcher`] - one complete pass for one location
//! - [`scheduler`] - per-location polling loops

pub mod config;
pub mod enumerator;
pub mod error;
pub mod paths;
pub mod reconciler;
pub mod run_config;
pub mod scheduler;
pub mod sync;
pub mod types;
pub mod watcher;

pub use config::WatchConfig;
pub use enumerator::Enumerator;
pub use error::{Result, WatchError};
pub use reconciler::{Classification, Reconciler};
pub use scheduler::{LocationSummary, Scheduler};
pub use sync::{SyncFailure, SyncReport, SyncStage};
pub use types::{ChangeBatch, ObservedEntry, PassReport, ScanStats};
pub use watcher::LocationWatcher;

pub use labwatch_backend::{HttpBackend, RemoteBackend, WatchedLocation};
pub use labwatch_db::{LabwatchDb, PersistedEntry};
