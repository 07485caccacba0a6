//! Background daemon that expires old artifacts.
//!
//! The scheduler sweeps once at startup, then on a fixed interval, and
//! whenever a [`CleanupTrigger`] asks for it. Triggers that arrive while a
//! sweep is pending collapse into a single sweep.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = CleanupScheduler::new(store, Duration::from_secs(2 * 3600));
//! let trigger = scheduler.trigger();
//! let shutdown = CancellationToken::new();
//! tokio::spawn(scheduler.run(shutdown.clone()));
//!
//! // after serving a download
//! trigger.request();
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{ArtifactStore, SweepReport};

/// Default time a finished artifact is kept (2 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default interval between periodic sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Handle used to request an out-of-schedule sweep.
#[derive(Debug, Clone)]
pub struct CleanupTrigger {
    notify: Arc<Notify>,
}

impl CleanupTrigger {
    /// Ask the scheduler for a sweep. Never blocks.
    pub fn request(&self) {
        self.notify.notify_one();
    }
}

pub struct CleanupScheduler {
    store: ArtifactStore,
    ttl: Duration,
    interval: Duration,
    notify: Arc<Notify>,
}

impl CleanupScheduler {
    pub fn new(store: ArtifactStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            interval: DEFAULT_SWEEP_INTERVAL,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn trigger(&self) -> CleanupTrigger {
        CleanupTrigger {
            notify: Arc::clone(&self.notify),
        }
    }

    /// Run one sweep, logging instead of propagating failure. Sweeps that
    /// touch nothing stay silent.
    pub async fn sweep_once(&self) -> Option<SweepReport> {
        match self.store.sweep(self.ttl).await {
            Ok(report) => {
                if report.deleted > 0 || report.failed > 0 {
                    debug!(
                        scanned = report.scanned,
                        deleted = report.deleted,
                        failed = report.failed,
                        "artifact sweep finished"
                    );
                }
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, "artifact sweep failed");
                None
            }
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            root = %self.store.root().display(),
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "artifact cleanup scheduler starting"
        );

        self.sweep_once().await;

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately and the startup sweep covered it
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("artifact cleanup scheduler shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.sweep_once().await;
                }

                _ = self.notify.notified() => {
                    debug!("on-demand artifact sweep");
                    self.sweep_once().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;
    use std::time::SystemTime;

    fn write_aged(store: &ArtifactStore, name: &str, age: Duration) -> std::path::PathBuf {
        let path = store.write(name, b"png").unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    async fn wait_gone(path: &Path) {
        for _ in 0..200 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never removed", path.display());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn startup_sweep_then_triggered_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let stale = write_aged(&store, "stale.png", 3 * DEFAULT_TTL);
        let fresh = write_aged(&store, "fresh.png", Duration::from_secs(60));

        let scheduler = CleanupScheduler::new(store.clone(), DEFAULT_TTL)
            .with_interval(Duration::from_secs(3600));
        let trigger = scheduler.trigger();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        wait_gone(&stale).await;
        assert!(fresh.exists());

        let late = write_aged(&store, "late.png", 3 * DEFAULT_TTL);
        trigger.request();
        wait_gone(&late).await;
        assert!(fresh.exists());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler stops on cancel")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn periodic_sweep_runs_without_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let scheduler = CleanupScheduler::new(store.clone(), DEFAULT_TTL)
            .with_interval(Duration::from_millis(20));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // written after the startup sweep has had a chance to run
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stale = write_aged(&store, "stale.png", 3 * DEFAULT_TTL);
        wait_gone(&stale).await;

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn idle_sweep_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let fresh = write_aged(&store, "fresh.png", Duration::from_secs(60));

        let scheduler = CleanupScheduler::new(store, DEFAULT_TTL);
        let report = scheduler.sweep_once().await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.failed, 0);
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn sweep_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("artifacts")).unwrap();
        store.remove_all().unwrap();

        let scheduler = CleanupScheduler::new(store, DEFAULT_TTL);
        assert!(scheduler.sweep_once().await.is_none());
    }

    #[tokio::test]
    async fn coalesced_triggers_do_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let scheduler = CleanupScheduler::new(store, DEFAULT_TTL);
        let trigger = scheduler.trigger();
        for _ in 0..100 {
            trigger.request();
        }
    }
}
