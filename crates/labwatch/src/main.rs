//! labwatch
//!
//! Watches instrument output folders and reports new and changed files to
//! the tracking backend.
//!
//! Usage:
//!     labwatch --backend-url http://tracker:8000/ --token <token> --interval 60

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use labwatch::{HttpBackend, LabwatchDb, RemoteBackend, Scheduler, WatchConfig};
use labwatch_logging::{init_logging, LogConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "labwatch", version, about = "Watch instrument output folders and report new files")]
struct Args {
    /// Tracking backend base URL
    #[arg(long, env = "LABWATCH_BACKEND_URL")]
    backend_url: Option<String>,

    /// API token for the tracking backend
    #[arg(long, env = "LABWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between scans of each location
    #[arg(long, env = "LABWATCH_INTERVAL")]
    interval: Option<u64>,

    /// Path to the SQLite state store
    #[arg(long, env = "LABWATCH_DATABASE")]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "LABWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level console output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// File config (or defaults) with CLI flags applied on top.
    fn resolve_config(&self) -> Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => WatchConfig::default(),
        };

        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(interval) = self.interval {
            config.scan_interval_secs = interval;
        }
        if let Some(database) = &self.database {
            config.database_path = database.to_string_lossy().to_string();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging(LogConfig {
        app_name: "labwatch",
        verbose: args.verbose,
    })?;

    let config = args.resolve_config()?;

    info!("Starting labwatch");
    info!("  Backend: {}", config.backend_url);
    info!("  Database: {}", config.database_path);
    info!("  Interval: {}s", config.scan_interval_secs);

    let db = LabwatchDb::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open state store at {}", config.database_path))?;

    let backend: Arc<dyn RemoteBackend> = Arc::new(
        HttpBackend::new(&config.backend_url, &config.token)
            .context("Failed to create backend client")?,
    );

    let locations = if config.locations.is_empty() {
        backend
            .get_watched_locations()
            .await
            .context("Failed to fetch watched locations from backend")?
    } else {
        config.locations.clone()
    };
    if locations.is_empty() {
        anyhow::bail!("No watched locations configured");
    }
    for location in &locations {
        info!(location = location.id, path = %location.folder_path, "Loaded location");
    }

    let scheduler = Scheduler::from_config(&config, locations, db.clone(), backend);
    let summaries = scheduler.run(shutdown_signal()).await;

    for summary in &summaries {
        info!(
            location = summary.location_id,
            passes = summary.passes,
            failed = summary.failed,
            panicked = summary.panicked,
            "Location summary"
        );
    }

    db.close().await;
    info!("labwatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
