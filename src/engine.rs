//! Engine composition: event store, merge publication, lifecycle timers.
//!
//! All mutation flows through the store behind one async mutex; background
//! tasks (sweeper, cancellation timers, wavefront loop) re-check state when
//! they wake, so a timer firing late is a no-op rather than an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::merge::{self, MergedView};
use crate::store::{EventStore, UpsertOutcome};
use crate::report::EewReport;
use crate::travel_time::TravelTimeTable;
use crate::wavefront::{self, WavefrontCadence, WavefrontSnapshot};

/// Engine tuning constants. Lifecycle values are configuration, not
/// literals.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Events are dropped this long after first observation
    pub retention: Duration,
    /// Canceled events stay visible this long before removal
    pub cancel_removal_delay: Duration,
    /// Sweep cadence for retention expiry
    pub sweep_interval: Duration,
    /// Wavefront recompute base period
    pub wavefront_period: Duration,
    /// Floor for the stretched wavefront period
    pub wavefront_min_period: Duration,
    /// Show low-accuracy (PLUM / level / single-station) estimates
    pub show_low_accuracy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(180),
            cancel_removal_delay: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(10),
            wavefront_period: Duration::from_secs(1),
            wavefront_min_period: Duration::from_millis(500),
            show_low_accuracy: false,
        }
    }
}

/// The aggregation engine. Owns the store; exposes merged views and
/// wavefront snapshots as watch channels that only emit on change.
pub struct Engine {
    store: Arc<Mutex<EventStore>>,
    config: EngineConfig,
    merged_tx: watch::Sender<MergedView>,
    wavefront_rx: watch::Receiver<WavefrontSnapshot>,
    map_busy: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl Engine {
    /// Start the engine with an optional travel-time table.
    ///
    /// Without a table the wavefront engine is inert for the session; report
    /// aggregation and merging remain fully functional.
    #[must_use]
    pub fn start(config: EngineConfig, table: Option<TravelTimeTable>) -> Self {
        let store = Arc::new(Mutex::new(EventStore::new()));
        let (merged_tx, _) = watch::channel(MergedView::default());
        let (wavefront_tx, wavefront_rx) = watch::channel(WavefrontSnapshot::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let map_busy = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_sweep_task(
            Arc::clone(&store),
            merged_tx.clone(),
            config.retention,
            config.sweep_interval,
            shutdown_tx.subscribe(),
        ));

        match table {
            Some(table) => {
                info!(rows = table.len(), "travel-time table loaded");
                tokio::spawn(wavefront::run_wavefront_task(
                    Arc::clone(&store),
                    Arc::new(table),
                    wavefront_tx,
                    Arc::clone(&map_busy),
                    WavefrontCadence {
                        period: config.wavefront_period,
                        min_period: config.wavefront_min_period,
                    },
                    shutdown_rx,
                ));
            }
            None => {
                warn!("no travel-time table; wavefront engine inert for this session");
            }
        }

        Self {
            store,
            config,
            merged_tx,
            wavefront_rx,
            map_busy,
            shutdown_tx,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingest one normalized report: upsert, recompute merged views, and
    /// schedule delayed removal if the event just became canceled.
    pub async fn ingest(&self, report: EewReport) -> UpsertOutcome {
        let event_id = report.event_id.clone();
        let canceled = report.is_canceled;

        let mut store = self.store.lock().await;
        let outcome = store.upsert(report, Instant::now());
        let view = merge::recompute(&store.snapshot());
        publish_if_changed(&self.merged_tx, view);
        if canceled && store.begin_cancel_removal(&event_id) {
            self.spawn_cancel_removal(event_id);
        }
        outcome
    }

    fn spawn_cancel_removal(&self, event_id: String) {
        let store = Arc::clone(&self.store);
        let merged_tx = self.merged_tx.clone();
        let delay = self.config.cancel_removal_delay;
        let mut shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return,
            }
            let mut store = store.lock().await;
            // The sweeper may have expired the event, or a newer report may
            // have un-canceled it; re-check before acting.
            let still_canceled = store
                .get(&event_id)
                .is_some_and(|e| e.current.is_canceled);
            if still_canceled && store.remove(&event_id) {
                debug!(event_id = %event_id, "removed canceled event after display delay");
                let view = merge::recompute(&store.snapshot());
                publish_if_changed(&merged_tx, view);
            } else {
                // This timer is spent; let a later cancel schedule a new one.
                store.clear_cancel_removal(&event_id);
            }
        });
    }

    /// Watch the merged intensity map and warning set; emits only on change.
    #[must_use]
    pub fn merged_views(&self) -> watch::Receiver<MergedView> {
        self.merged_tx.subscribe()
    }

    /// Watch per-tick wavefront snapshots.
    #[must_use]
    pub fn wavefronts(&self) -> watch::Receiver<WavefrontSnapshot> {
        self.wavefront_rx.clone()
    }

    /// Signal that the map is being panned/zoomed, throttling the wavefront
    /// cadence.
    pub fn set_map_busy(&self, busy: bool) {
        self.map_busy.store(busy, Ordering::Relaxed);
    }

    /// Cloned snapshot of the active events.
    pub async fn snapshot(&self) -> Vec<crate::store::EewEvent> {
        self.store.lock().await.snapshot()
    }

    /// Stop all background tasks. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish_if_changed(tx: &watch::Sender<MergedView>, view: MergedView) {
    tx.send_if_modified(|current| {
        if *current == view {
            false
        } else {
            *current = view;
            true
        }
    });
}

/// Periodic retention sweep: expire stale events and republish merged views
/// when membership changed.
async fn run_sweep_task(
    store: Arc<Mutex<EventStore>>,
    merged_tx: watch::Sender<MergedView>,
    retention: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("sweep task shutting down");
                    return;
                }
                continue;
            }
        }

        let mut store = store.lock().await;
        let removed = store.expire_stale(Instant::now(), retention);
        if !removed.is_empty() {
            debug!(count = removed.len(), "sweep expired events");
            let view = merge::recompute(&store.snapshot());
            publish_if_changed(&merged_tx, view);
        }
    }
}
