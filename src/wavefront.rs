//! Wavefront engine: live P/S front radii for every tracked epicenter.
//!
//! A self-rescheduling task recomputes all fronts in one pass per tick and
//! publishes an immutable snapshot. `NaN` distances mean "do not draw".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::Duration;
use tracing::{debug, trace};

use crate::store::{EewEvent, EventStore};
use crate::travel_time::TravelTimeTable;

/// A tracked epicenter eligible for wavefront drawing.
#[derive(Debug, Clone)]
pub struct TrackedEpicenter {
    pub event_id: String,
    pub lat: f64,
    pub lng: f64,
    pub depth_km: f64,
    pub origin_time: DateTime<Utc>,
}

/// Current P/S front radii for one event.
#[derive(Debug, Clone, Serialize)]
pub struct Wavefront {
    pub event_id: String,
    pub lat: f64,
    pub lng: f64,
    /// `NaN` means the P front is not drawable right now
    pub p_distance_km: f64,
    /// `NaN` means the S front is not drawable right now
    pub s_distance_km: f64,
}

/// One tick's output: all fronts, computed together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WavefrontSnapshot {
    pub computed_at: Option<DateTime<Utc>>,
    pub fronts: Vec<Wavefront>,
}

/// Select epicenters to track: active, non-canceled events with a located
/// hypocenter, a known depth, and an origin time.
#[must_use]
pub fn tracked_epicenters(events: &[EewEvent]) -> Vec<TrackedEpicenter> {
    let mut tracked: Vec<TrackedEpicenter> = events
        .iter()
        .filter(|e| !e.current.is_canceled)
        .filter_map(|e| {
            let epicenter = e.epicenter.as_ref()?;
            Some(TrackedEpicenter {
                event_id: e.current.event_id.clone(),
                lat: epicenter.lat,
                lng: epicenter.lng,
                depth_km: epicenter.depth_km?,
                origin_time: epicenter.origin_time?,
            })
        })
        .collect();
    tracked.sort_by(|a, b| a.event_id.cmp(&b.event_id));
    tracked
}

/// Compute one snapshot for all tracked epicenters. Pure.
#[must_use]
pub fn compute_snapshot(
    table: &TravelTimeTable,
    tracked: &[TrackedEpicenter],
    now: DateTime<Utc>,
) -> WavefrontSnapshot {
    let fronts = tracked
        .iter()
        .map(|t| {
            let elapsed_s =
                now.signed_duration_since(t.origin_time).num_milliseconds() as f64 / 1000.0;
            let (p_distance_km, s_distance_km) = table.interpolate(t.depth_km, elapsed_s);
            Wavefront {
                event_id: t.event_id.clone(),
                lat: t.lat,
                lng: t.lng,
                p_distance_km,
                s_distance_km,
            }
        })
        .collect();

    WavefrontSnapshot {
        computed_at: Some(now),
        fronts,
    }
}

/// Cadence configuration for the wavefront task.
#[derive(Debug, Clone, Copy)]
pub struct WavefrontCadence {
    /// Base recompute period
    pub period: Duration,
    /// Floor for the stretched period
    pub min_period: Duration,
}

impl WavefrontCadence {
    /// Effective tick interval: stretched x1.5 while the map is being
    /// manipulated, floored at `min_period`.
    #[must_use]
    pub fn tick_interval(&self, map_busy: bool) -> Duration {
        let interval = if map_busy {
            self.period.mul_f64(1.5)
        } else {
            self.period
        };
        interval.max(self.min_period)
    }
}

/// Background recompute loop.
///
/// Each tick reads a store snapshot, recomputes every front, and publishes.
/// The pass runs inline before the next sleep, so passes never overlap; a
/// slow pass simply delays the next tick. Exits when the shutdown signal
/// flips.
pub async fn run_wavefront_task(
    store: Arc<Mutex<EventStore>>,
    table: Arc<TravelTimeTable>,
    tx: watch::Sender<WavefrontSnapshot>,
    map_busy: Arc<AtomicBool>,
    cadence: WavefrontCadence,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let interval = cadence.tick_interval(map_busy.load(Ordering::Relaxed));
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                // A dropped sender means the engine is gone; stop either way.
                if changed.is_err() || *shutdown.borrow() {
                    debug!("wavefront task shutting down");
                    return;
                }
                continue;
            }
        }

        let events = store.lock().await.snapshot();
        let tracked = tracked_epicenters(&events);
        let snapshot = compute_snapshot(&table, &tracked, Utc::now());
        trace!(fronts = snapshot.fronts.len(), "wavefront snapshot published");
        let _ = tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::EpicenterIcon;
    use crate::report::{EewReport, Hypocenter, Magnitude};
    use crate::store::Epicenter;
    use crate::travel_time::TravelTimeRow;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tokio::time::Instant;

    fn table() -> TravelTimeTable {
        TravelTimeTable::new(vec![
            TravelTimeRow { p_time_s: 10.0, s_time_s: 18.0, depth_km: 30, distance_km: 80 },
            TravelTimeRow { p_time_s: 20.0, s_time_s: 30.0, depth_km: 30, distance_km: 100 },
        ])
    }

    fn event(event_id: &str, canceled: bool, epicenter: Option<Epicenter>) -> EewEvent {
        EewEvent {
            current: EewReport {
                event_id: event_id.to_string(),
                serial_no: "1".to_string(),
                is_canceled: canceled,
                is_last_info: false,
                is_warning: false,
                is_training: false,
                origin_time: None,
                arrival_time: None,
                hypocenter: Hypocenter::default(),
                magnitude: Magnitude::Unknown,
                regional_forecast: BTreeMap::new(),
                warning_regions: Vec::new(),
            },
            start_time: Instant::now(),
            epicenter,
            cancel_removal_scheduled: false,
        }
    }

    fn epicenter(origin: DateTime<Utc>) -> Epicenter {
        Epicenter {
            lat: 35.0,
            lng: 139.0,
            depth_km: Some(30.0),
            origin_time: Some(origin),
            icon: EpicenterIcon::Confirmed,
        }
    }

    #[test]
    fn test_tracked_skips_canceled_and_unlocated() {
        let origin = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).single().expect("time");
        let events = vec![
            event("A", false, Some(epicenter(origin))),
            event("B", true, Some(epicenter(origin))),
            event("C", false, None),
        ];
        let tracked = tracked_epicenters(&events);
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].event_id, "A");
    }

    #[test]
    fn test_snapshot_interpolates_all_fronts() {
        let origin = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).single().expect("time");
        let now = origin + chrono::Duration::seconds(15);
        let events = vec![event("A", false, Some(epicenter(origin)))];

        let snapshot = compute_snapshot(&table(), &tracked_epicenters(&events), now);
        assert_eq!(snapshot.fronts.len(), 1);
        assert!((snapshot.fronts[0].p_distance_km - 90.0).abs() < 1e-9);
        assert!(snapshot.fronts[0].s_distance_km.is_nan());
    }

    #[test]
    fn test_snapshot_outside_domain_is_nan() {
        let origin = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).single().expect("time");
        let now = origin + chrono::Duration::seconds(2001);
        let events = vec![event("A", false, Some(epicenter(origin)))];

        let snapshot = compute_snapshot(&table(), &tracked_epicenters(&events), now);
        assert!(snapshot.fronts[0].p_distance_km.is_nan());
        assert!(snapshot.fronts[0].s_distance_km.is_nan());
    }

    #[test]
    fn test_cadence_stretch_and_floor() {
        let cadence = WavefrontCadence {
            period: Duration::from_millis(1000),
            min_period: Duration::from_millis(500),
        };
        assert_eq!(cadence.tick_interval(false), Duration::from_millis(1000));
        assert_eq!(cadence.tick_interval(true), Duration::from_millis(1500));

        let tight = WavefrontCadence {
            period: Duration::from_millis(200),
            min_period: Duration::from_millis(500),
        };
        // Floored at the minimum even when stretched.
        assert_eq!(tight.tick_interval(true), Duration::from_millis(500));
        assert_eq!(tight.tick_interval(false), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_publishes_and_shuts_down() {
        let store = Arc::new(Mutex::new(EventStore::new()));
        let origin = Utc::now();
        {
            let mut guard = store.lock().await;
            let mut r = event("A", false, Some(epicenter(origin)));
            r.current.origin_time = Some(origin);
            r.current.hypocenter.latitude = Some(35.0);
            r.current.hypocenter.longitude = Some(139.0);
            r.current.hypocenter.depth_km = Some(30.0);
            guard.upsert(r.current.clone(), Instant::now());
        }

        let (tx, mut rx) = watch::channel(WavefrontSnapshot::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_wavefront_task(
            store,
            Arc::new(table()),
            tx,
            Arc::new(AtomicBool::new(false)),
            WavefrontCadence {
                period: Duration::from_secs(1),
                min_period: Duration::from_millis(500),
            },
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        rx.changed().await.expect("snapshot published");
        assert!(rx.borrow().computed_at.is_some());
        assert_eq!(rx.borrow().fronts.len(), 1);

        shutdown_tx.send(true).expect("send shutdown");
        handle.await.expect("task exits cleanly");
    }
}
