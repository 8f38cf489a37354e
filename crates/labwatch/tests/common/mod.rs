//! Shared helpers for labwatch integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use filetime::{set_file_mtime, FileTime};
use labwatch::paths::normalize_path;
use labwatch::{LabwatchDb, LocationWatcher, RemoteBackend, SyncStage, WatchedLocation};
use labwatch_backend::{
    BackendError, NewRemoteFile, NewRunConfig, RemoteExperiment, RemoteFile, RemoteRunConfig,
};
use tempfile::TempDir;

#[derive(Default)]
struct Recorded {
    next_id: i64,
    files: HashMap<String, RemoteFile>,
    created: Vec<NewRemoteFile>,
    lookups: Vec<Vec<String>>,
    updates: Vec<Vec<RemoteFile>>,
    experiments: HashMap<String, RemoteExperiment>,
    run_configs: Vec<NewRunConfig>,
}

/// In-memory [`RemoteBackend`] that records every call.
#[derive(Default)]
pub struct RecordingBackend {
    state: Mutex<Recorded>,
    locations: Vec<WatchedLocation>,
    /// `create_file` fails for paths containing any of these
    reject: Mutex<HashSet<String>>,
    /// `create_file` panics for paths containing this
    panic_on: Option<String>,
    fail_lookups: bool,
    fail_updates: bool,
}

fn server_error(what: &str) -> BackendError {
    BackendError::Status {
        method: "POST",
        url: format!("http://fake/{what}"),
        status: 500,
        body: "rejected".to_string(),
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(mut self, locations: Vec<WatchedLocation>) -> Self {
        self.locations = locations;
        self
    }

    pub fn panicking_on(mut self, fragment: &str) -> Self {
        self.panic_on = Some(fragment.to_string());
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn reject(&self, fragment: &str) {
        self.reject.lock().unwrap().insert(fragment.to_string());
    }

    pub fn accept_all(&self) {
        self.reject.lock().unwrap().clear();
    }

    /// Pretend the backend already has a record for `path`.
    pub fn seed_file(&self, path: &str, id: i64) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            path.to_string(),
            RemoteFile {
                id,
                file_path: path.to_string(),
                folder_watching_location: 0,
                size: 0,
                experiment: None,
                processing: false,
                ready_for_processing: false,
            },
        );
    }

    pub fn created_paths(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.created.iter().map(|f| f.file_path.clone()).collect()
    }

    pub fn created(&self) -> Vec<NewRemoteFile> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn updates(&self) -> Vec<Vec<RemoteFile>> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn experiments(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<_> = state.experiments.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn run_configs(&self) -> Vec<NewRunConfig> {
        self.state.lock().unwrap().run_configs.clone()
    }

    pub fn call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.created.len() + state.lookups.len() + state.updates.len() + state.run_configs.len()
    }
}

#[async_trait]
impl RemoteBackend for RecordingBackend {
    async fn create_file(&self, file: &NewRemoteFile) -> labwatch_backend::Result<RemoteFile> {
        if let Some(fragment) = &self.panic_on {
            if file.file_path.contains(fragment.as_str()) {
                panic!("backend exploded on {}", file.file_path);
            }
        }
        let rejected = self
            .reject
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| file.file_path.contains(fragment.as_str()));
        if rejected {
            return Err(server_error("api/files/"));
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = RemoteFile {
            id: 1000 + state.next_id,
            file_path: file.file_path.clone(),
            folder_watching_location: file.folder_watching_location,
            size: file.size,
            experiment: None,
            processing: false,
            ready_for_processing: false,
        };
        state.created.push(file.clone());
        state.files.insert(file.file_path.clone(), created.clone());
        Ok(created)
    }

    async fn get_files_by_path(&self, paths: &[String]) -> labwatch_backend::Result<Vec<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(paths.to_vec());
        if self.fail_lookups {
            return Err(server_error("api/files/get_exact_paths/"));
        }
        Ok(paths
            .iter()
            .filter_map(|p| state.files.get(p).cloned())
            .collect())
    }

    async fn update_files(&self, files: &[RemoteFile]) -> labwatch_backend::Result<Vec<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        state.updates.push(files.to_vec());
        if self.fail_updates {
            return Err(server_error("api/files/update_multiple/"));
        }
        Ok(files.to_vec())
    }

    async fn get_watched_locations(&self) -> labwatch_backend::Result<Vec<WatchedLocation>> {
        Ok(self.locations.clone())
    }

    async fn create_or_get_experiment(
        &self,
        name: &str,
    ) -> labwatch_backend::Result<RemoteExperiment> {
        let mut state = self.state.lock().unwrap();
        let next = state.experiments.len() as i64 + 1;
        let experiment = state
            .experiments
            .entry(name.to_string())
            .or_insert_with(|| RemoteExperiment {
                id: next,
                experiment_name: name.to_string(),
                vendor: String::new(),
                sample_count: 0,
            })
            .clone();
        Ok(experiment)
    }

    async fn create_run_config(
        &self,
        config: &NewRunConfig,
    ) -> labwatch_backend::Result<RemoteRunConfig> {
        let mut state = self.state.lock().unwrap();
        state.run_configs.push(config.clone());
        Ok(RemoteRunConfig {
            id: state.run_configs.len() as i64,
            config_file_path: config.config_file_path.clone(),
            folder_watching_location: config.folder_watching_location,
            experiment: config.experiment,
            content: config.content.clone(),
            fasta_ready: false,
            fasta_required: false,
            spectral_library_ready: false,
            spectral_library_required: false,
        })
    }
}

/// Scratch watch root plus an on-disk store.
pub struct TestEnv {
    _temp: TempDir,
    scratch: PathBuf,
    pub root: PathBuf,
    pub db: LabwatchDb,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("instrument");
        fs::create_dir_all(&root).expect("Failed to create watch root");
        let root = root.canonicalize().expect("Failed to canonicalize root");
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).expect("Failed to create scratch dir");
        let db = LabwatchDb::open(temp.path().join("state.sqlite3"))
            .await
            .expect("Failed to open store");

        Self {
            _temp: temp,
            scratch,
            root,
            db,
        }
    }

    pub fn location(&self, id: i64, extensions: &str, ignore_term: &str) -> WatchedLocation {
        WatchedLocation {
            id,
            folder_path: self.root.to_string_lossy().to_string(),
            extensions: extensions.to_string(),
            ignore_term: ignore_term.to_string(),
            network_folder: false,
        }
    }

    pub fn watcher(
        &self,
        location: WatchedLocation,
        backend: Arc<RecordingBackend>,
        resync_unsynced: bool,
    ) -> LocationWatcher {
        let sync = SyncStage::new(self.db.clone(), backend).with_resync_unsynced(resync_unsynced);
        LocationWatcher::new(location, self.db.clone(), sync)
    }

    pub fn write_file(&self, rel: &str, bytes: usize) -> PathBuf {
        write_bytes(&self.root.join(rel), &vec![b'x'; bytes]);
        self.root.join(rel)
    }

    pub fn write_text(&self, rel: &str, text: &str) -> PathBuf {
        write_bytes(&self.root.join(rel), text.as_bytes());
        self.root.join(rel)
    }

    pub fn set_mtime(&self, rel: &str, secs: i64) {
        set_file_mtime(self.root.join(rel), FileTime::from_unix_time(secs, 0))
            .expect("Failed to set mtime");
    }

    /// Place a directory chain deeper than PATH_MAX at `rel`.
    ///
    /// The chain is grown by renaming it into a fresh parent each round, so
    /// no call names the full path; walking into it fails with
    /// ENAMETOOLONG regardless of privileges.
    #[cfg(unix)]
    pub fn add_overlong_chain(&self, rel: &str) {
        let top = self.scratch.join("top");
        let next = self.scratch.join("next");
        let segment = "d".repeat(200);
        fs::create_dir_all(&top).expect("Failed to create chain");
        fs::write(top.join("deepest.raw"), b"x").expect("Failed to write chain file");
        for _ in 0..30 {
            fs::create_dir(&next).expect("Failed to create chain level");
            fs::rename(&top, next.join(&segment)).expect("Failed to nest chain");
            fs::rename(&next, &top).expect("Failed to lift chain");
        }
        fs::rename(&top, self.root.join(rel)).expect("Failed to place chain");
    }

    /// Store key for a path under the root.
    pub fn key(&self, rel: &str) -> String {
        normalize_path(&self.root.join(rel))
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, bytes).expect("Failed to write file");
}
