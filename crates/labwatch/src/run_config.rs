//! Run-config readiness flow.
//!
//! A `*.cat.yml` / `*.cat.yaml` file describes a processing run. Once it
//! declares `cat_ready: true`, the experiment named by its parent
//! directory path is fetched or created and the config is registered remotely.

use std::path::Path;

use labwatch_backend::{NewRunConfig, RemoteBackend, RemoteRunConfig, WatchedLocation};
use tracing::{debug, info};

use crate::error::{Result, WatchError};
use crate::paths::parent_dir;

/// Key that marks a run config as ready for processing.
pub const READY_KEY: &str = "cat_ready";

/// Parse run-config YAML into a JSON object.
///
/// The top level must be a mapping.
pub fn parse_run_config(text: &str) -> Result<serde_json::Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    if !yaml.is_mapping() {
        return Err(WatchError::Config(
            "run config must be a YAML mapping".to_string(),
        ));
    }
    Ok(serde_json::to_value(yaml)?)
}

pub fn is_ready(content: &serde_json::Value) -> bool {
    content
        .get(READY_KEY)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Register the run config at `path` if it is ready.
///
/// Returns `Ok(None)` when the file does not declare `cat_ready: true`.
pub async fn register_if_ready(
    backend: &dyn RemoteBackend,
    location: &WatchedLocation,
    path: &str,
) -> Result<Option<RemoteRunConfig>> {
    let text = tokio::fs::read_to_string(Path::new(path)).await?;
    let content = parse_run_config(&text)?;
    if !is_ready(&content) {
        debug!(path, "Run config not ready");
        return Ok(None);
    }

    let experiment_name = parent_dir(path).ok_or_else(|| {
        WatchError::Config(format!("run config {path} has no parent directory"))
    })?;
    let experiment = backend.create_or_get_experiment(experiment_name).await?;

    let created = backend
        .create_run_config(&NewRunConfig {
            config_file_path: path.to_string(),
            folder_watching_location: location.id,
            experiment: experiment.id,
            content,
        })
        .await?;

    info!(
        path,
        experiment = %experiment.experiment_name,
        run_config_id = created.id,
        "Registered run config"
    );
    Ok(Some(created))
}
