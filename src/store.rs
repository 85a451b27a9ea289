//! Event store: the single owner of per-event aggregate state.
//!
//! All mutation is funneled through `upsert`/`remove`/`expire_stale`;
//! derived views (merge, wavefront) are recomputed from cloned snapshots and
//! never mutate store state in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::method::EpicenterIcon;
use crate::report::EewReport;

/// Last-known epicenter for an event, kept across reports that omit
/// coordinates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Epicenter {
    pub lat: f64,
    pub lng: f64,
    pub depth_km: Option<f64>,
    pub origin_time: Option<DateTime<Utc>>,
    pub icon: EpicenterIcon,
}

/// Mutable aggregate for one `event_id`.
#[derive(Debug, Clone)]
pub struct EewEvent {
    /// Latest report seen for this event (highest serial in normal operation)
    pub current: EewReport,
    /// Wall-clock instant the event was first observed, not its origin time
    pub start_time: Instant,
    pub epicenter: Option<Epicenter>,
    pub cancel_removal_scheduled: bool,
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Keyed collection of active events.
#[derive(Debug, Default)]
pub struct EventStore {
    events: HashMap<String, EewEvent>,
}

impl EventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn contains(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    #[must_use]
    pub fn get(&self, event_id: &str) -> Option<&EewEvent> {
        self.events.get(event_id)
    }

    /// Insert or update the event for this report.
    ///
    /// The incoming report replaces `current` unconditionally: last received
    /// wins, even if its serial is not greater (a regression is logged, not
    /// rejected). The epicenter is recomputed only when the new report has
    /// valid coordinates; otherwise the prior epicenter stands.
    pub fn upsert(&mut self, report: EewReport, now: Instant) -> UpsertOutcome {
        let event_id = report.event_id.clone();
        let new_epicenter = derive_epicenter(&report);

        match self.events.get_mut(&event_id) {
            Some(event) => {
                if let (Some(new), Some(old)) =
                    (report.serial_ordinal(), event.current.serial_ordinal())
                {
                    if new <= old {
                        warn!(
                            event_id = %event_id,
                            old_serial = old,
                            new_serial = new,
                            "serial did not advance; applying last-received report"
                        );
                    }
                }
                event.current = report;
                if new_epicenter.is_some() {
                    event.epicenter = new_epicenter;
                }
                UpsertOutcome::Updated
            }
            None => {
                debug!(event_id = %event_id, "tracking new event");
                self.events.insert(
                    event_id,
                    EewEvent {
                        current: report,
                        start_time: now,
                        epicenter: new_epicenter,
                        cancel_removal_scheduled: false,
                    },
                );
                UpsertOutcome::Created
            }
        }
    }

    /// Remove an event outright. Returns whether it was present.
    pub fn remove(&mut self, event_id: &str) -> bool {
        self.events.remove(event_id).is_some()
    }

    /// Drop every event first observed at least `retention` ago.
    ///
    /// Returns the removed ids so the caller can prune merged views.
    pub fn expire_stale(&mut self, now: Instant, retention: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .events
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.start_time) >= retention)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            debug!(event_id = %id, "expiring stale event");
            self.events.remove(id);
        }
        expired
    }

    /// Mark a cancellation removal as pending for this event.
    ///
    /// Returns `true` only when the event exists, is canceled, and no removal
    /// is already scheduled; at most one pending timer per event.
    pub fn begin_cancel_removal(&mut self, event_id: &str) -> bool {
        match self.events.get_mut(event_id) {
            Some(event) if event.current.is_canceled && !event.cancel_removal_scheduled => {
                event.cancel_removal_scheduled = true;
                true
            }
            _ => false,
        }
    }

    /// Clear a pending cancellation-removal mark without removing the event.
    ///
    /// Called when a removal timer fires and finds the event no longer
    /// canceled; a later cancel report may then schedule a fresh timer.
    pub fn clear_cancel_removal(&mut self, event_id: &str) {
        if let Some(event) = self.events.get_mut(event_id) {
            event.cancel_removal_scheduled = false;
        }
    }

    /// Cloned view of all active events, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EewEvent> {
        self.events.values().cloned().collect()
    }
}

fn derive_epicenter(report: &EewReport) -> Option<Epicenter> {
    let (lat, lng) = report.hypocenter.coordinates()?;
    Some(Epicenter {
        lat,
        lng,
        depth_km: report.hypocenter.depth_km,
        origin_time: report.effective_time(),
        icon: report.method().icon_kind(),
    })
}
