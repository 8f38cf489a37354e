//! REST client for the tracking backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::error::{BackendError, Result};
use crate::types::{
    NewRemoteFile, NewRunConfig, RemoteExperiment, RemoteFile, RemoteRunConfig, WatchedLocation,
};

const FILES: &str = "api/files/";
const FILES_BY_PATH: &str = "api/files/get_exact_paths/";
const FILES_UPDATE: &str = "api/files/update_multiple/";
const LOCATIONS: &str = "api/folderlocations/get_all_paths/";
const EXPERIMENT_BY_NAME: &str = "api/experiments/get_exact_name/";
const RUN_CONFIGS: &str = "api/catapultrunconfig/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the watcher needs from the tracking service.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Register a single new file.
    async fn create_file(&self, file: &NewRemoteFile) -> Result<RemoteFile>;

    /// Look up files by exact path. Unknown paths are simply absent from the result.
    async fn get_files_by_path(&self, paths: &[String]) -> Result<Vec<RemoteFile>>;

    /// Push updated size/metadata for files the backend already knows.
    async fn update_files(&self, files: &[RemoteFile]) -> Result<Vec<RemoteFile>>;

    /// All configured watch roots.
    async fn get_watched_locations(&self) -> Result<Vec<WatchedLocation>>;

    /// Fetch the experiment with this exact name, creating it if missing.
    async fn create_or_get_experiment(&self, name: &str) -> Result<RemoteExperiment>;

    /// Register a run config for processing.
    async fn create_run_config(&self, config: &NewRunConfig) -> Result<RemoteRunConfig>;
}

/// [`RemoteBackend`] over HTTP with token authentication.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for `base_url` authenticating with `token`.
    ///
    /// An empty token sends no `Authorization` header.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        if !token.is_empty() {
            let value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|e| BackendError::InvalidRequest(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(method = %method, url = %url, "Backend request");

        let mut request = self.http_client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let response = check_status(method_name(&method), &url, response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn create_file(&self, file: &NewRemoteFile) -> Result<RemoteFile> {
        self.send(Method::POST, FILES, Some(file)).await
    }

    async fn get_files_by_path(&self, paths: &[String]) -> Result<Vec<RemoteFile>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "file_paths": paths, "create": false });
        self.send(Method::POST, FILES_BY_PATH, Some(&body)).await
    }

    async fn update_files(&self, files: &[RemoteFile]) -> Result<Vec<RemoteFile>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "files": files });
        self.send(Method::PUT, FILES_UPDATE, Some(&body)).await
    }

    async fn get_watched_locations(&self) -> Result<Vec<WatchedLocation>> {
        self.send::<(), _>(Method::GET, LOCATIONS, None).await
    }

    async fn create_or_get_experiment(&self, name: &str) -> Result<RemoteExperiment> {
        if name.is_empty() {
            return Err(BackendError::InvalidRequest(
                "experiment name is empty".to_string(),
            ));
        }
        let body = json!({ "experiment_name": name, "create": true });
        self.send(Method::POST, EXPERIMENT_BY_NAME, Some(&body)).await
    }

    async fn create_run_config(&self, config: &NewRunConfig) -> Result<RemoteRunConfig> {
        self.send(Method::POST, RUN_CONFIGS, Some(config)).await
    }
}

/// Parse the base URL, forcing a trailing slash so relative endpoints
/// join under it instead of replacing its last segment.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

async fn check_status(method: &'static str, url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        _ => "HTTP",
    }
}
