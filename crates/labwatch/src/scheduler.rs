//! Per-location polling loops.
//!
//! Every location gets its own tokio task that runs a pass immediately and
//! then once per interval. A failing or panicking pass is contained to that
//! pass: the loop logs it and waits for the next tick, and other locations
//! never notice.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use labwatch_backend::{RemoteBackend, WatchedLocation};
use labwatch_db::LabwatchDb;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::WatchConfig;
use crate::sync::SyncStage;
use crate::watcher::LocationWatcher;

/// Pass counters for one location, returned when the scheduler stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSummary {
    pub location_id: i64,
    pub passes: u64,
    pub failed: u64,
    pub panicked: u64,
}

impl LocationSummary {
    pub fn succeeded(&self) -> u64 {
        self.passes - self.failed - self.panicked
    }
}

pub struct Scheduler {
    watchers: Vec<Arc<LocationWatcher>>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            watchers: Vec::new(),
            interval,
        }
    }

    /// Build one watcher per location sharing `db` and `backend`.
    pub fn from_config(
        config: &WatchConfig,
        locations: Vec<WatchedLocation>,
        db: LabwatchDb,
        backend: Arc<dyn RemoteBackend>,
    ) -> Self {
        let sync = SyncStage::new(db.clone(), backend).with_resync_unsynced(config.resync_unsynced);
        let mut scheduler = Self::new(config.scan_interval());
        for location in locations {
            scheduler.add(LocationWatcher::new(location, db.clone(), sync.clone()));
        }
        scheduler
    }

    pub fn add(&mut self, watcher: LocationWatcher) {
        self.watchers.push(Arc::new(watcher));
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Run every location until `shutdown` resolves.
    ///
    /// A pass in progress when shutdown arrives is allowed to finish.
    pub async fn run<F>(self, shutdown: F) -> Vec<LocationSummary>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        info!(
            locations = self.watchers.len(),
            interval_secs = self.interval.as_secs(),
            "Starting scheduler"
        );

        let handles: Vec<(i64, JoinHandle<LocationSummary>)> = self
            .watchers
            .into_iter()
            .map(|watcher| {
                let id = watcher.location().id;
                let handle = tokio::spawn(location_loop(watcher, self.interval, stop_rx.clone()));
                (id, handle)
            })
            .collect();

        shutdown.await;
        info!("Shutdown requested, stopping location loops");
        let _ = stop_tx.send(true);

        let mut summaries = Vec::with_capacity(handles.len());
        for (location_id, handle) in handles {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(location = location_id, error = %e, "Location loop ended abnormally");
                    summaries.push(LocationSummary {
                        location_id,
                        ..Default::default()
                    });
                }
            }
        }
        summaries
    }
}

async fn location_loop(
    watcher: Arc<LocationWatcher>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> LocationSummary {
    let location = watcher.location().clone();
    let mut summary = LocationSummary {
        location_id: location.id,
        ..Default::default()
    };

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(location = location.id, path = %location.folder_path, "Watching location");

    loop {
        tokio::select! {
            biased;

            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        summary.passes += 1;

        // The pass runs in its own task so a panic is caught at the join.
        let pass_watcher = Arc::clone(&watcher);
        let pass = tokio::spawn(async move { pass_watcher.run_pass().await });
        match pass.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                summary.failed += 1;
                warn!(location = location.id, path = %location.folder_path, error = %e, "Scan pass failed");
            }
            Err(e) => {
                summary.panicked += 1;
                error!(location = location.id, error = %e, "Scan pass panicked");
            }
        }
    }

    info!(location = location.id, passes = summary.passes, "Stopped watching location");
    summary
}
