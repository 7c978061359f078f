use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::client::SmatrixClient;
use crate::diff::diff_snapshots;
use crate::types::*;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// What an entity needs from whoever keeps thermostat data fresh.
pub trait SnapshotSource: Send + Sync {
    /// Latest successfully fetched snapshot, if any.
    fn snapshot(&self) -> Option<Arc<Snapshot>>;

    /// Whether the most recent fetch cycle succeeded.
    fn last_update_success(&self) -> bool;

    /// Ask for an out-of-band fetch. Returns immediately.
    fn request_refresh(&self);
}

pub struct CoordinatorBuilder {
    client: Arc<SmatrixClient>,
    interval: Duration,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
}

impl CoordinatorBuilder {
    pub fn new(client: Arc<SmatrixClient>) -> Self {
        Self {
            client,
            interval: DEFAULT_SCAN_INTERVAL,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn build(self) -> Coordinator {
        let interval = if self.interval.is_zero() {
            warn!("zero scan interval, using {DEFAULT_SCAN_INTERVAL:?}");
            DEFAULT_SCAN_INTERVAL
        } else {
            self.interval
        };
        let (snapshot_tx, _) = watch::channel(None);
        Coordinator {
            client: self.client,
            interval,
            snapshot_tx,
            last_update_success: AtomicBool::new(false),
            refresh_requested: Notify::new(),
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
        }
    }
}

/// Owns the published thermostat snapshot and the schedule that refreshes it.
pub struct Coordinator {
    client: Arc<SmatrixClient>,
    interval: Duration,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    last_update_success: AtomicBool,
    refresh_requested: Notify,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
}

impl Coordinator {
    pub fn builder(client: Arc<SmatrixClient>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(client)
    }

    pub fn client(&self) -> &Arc<SmatrixClient> {
        &self.client
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// Runs one fetch cycle. On failure the previous snapshot stays published.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        match self.client.fetch_thermostats().await {
            Ok(thermostats) => {
                let snapshot = Arc::new(Snapshot::new(thermostats));
                let previous = self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
                if !self.last_update_success.swap(true, Ordering::SeqCst) && previous.is_some() {
                    info!(host = %self.client.host(), "fetching thermostats recovered");
                }

                let events = diff_snapshots(previous.as_deref(), &snapshot);
                for event in &events {
                    for cb in &self.event_callbacks {
                        cb(event);
                    }
                }
                for cb in &self.snapshot_callbacks {
                    cb(&snapshot);
                }

                if events.is_empty() {
                    trace!(count = snapshot.len(), "refresh: no changes");
                } else {
                    debug!(count = events.len(), "processed events from refresh");
                }
                Ok(snapshot)
            }
            Err(e) => {
                let was_ok = self.last_update_success.swap(false, Ordering::SeqCst);
                let kind = if e.is_transport() {
                    "error communicating with hub"
                } else {
                    "error fetching thermostats"
                };
                if was_ok {
                    error!(host = %self.client.host(), "{kind}: {e}");
                } else {
                    debug!(host = %self.client.host(), "{kind}: {e}");
                }
                Err(e)
            }
        }
    }

    /// Starts the periodic poll loop. The first scheduled fetch happens one interval from now.
    pub fn spawn(self: &Arc<Self>) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move { coordinator.run(shutdown_rx).await });
        PollerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        debug!(interval = ?self.interval, "poller started");
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = self.refresh_requested.notified() => {
                    debug!("out-of-band refresh");
                    ticker.reset();
                }
                _ = ticker.tick() => trace!("scheduled refresh"),
            }
            // Failures are logged inside refresh; the next tick retries.
            let _ = self.refresh().await;
        }
        debug!("poller stopped");
    }
}

impl SnapshotSource for Coordinator {
    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }
}

/// Running poll loop. Dropping the handle also ends the loop, but without waiting for an
/// in-flight fetch; [`PollerHandle::stop`] waits.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signals the loop and waits for any in-flight fetch to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("poller task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
