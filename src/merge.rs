//! Cross-event region merging.
//!
//! Pure recomputation from an event-store snapshot: the merged intensity
//! map is the per-region ordinal maximum across active events, and the
//! merged warning set is the union of their warning areas. Re-running on
//! the same set of active events always yields the same result.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::intensity::JmaIntensity;
use crate::report::WarningRegion;
use crate::store::EewEvent;

/// Merged situational view across all active events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedView {
    /// Region code -> strongest forecast intensity among active events
    pub intensity: BTreeMap<String, JmaIntensity>,
    /// Union of warning areas, deduplicated by code
    pub warnings: Vec<WarningRegion>,
}

impl MergedView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty() && self.warnings.is_empty()
    }
}

/// Recompute the merged view from a snapshot of active events.
///
/// Canceled events contribute nothing. Unknown intensities never win over a
/// known rank; on equal ranks the first contribution stands. Events are
/// visited in id order so the result is independent of snapshot ordering.
#[must_use]
pub fn recompute(events: &[EewEvent]) -> MergedView {
    let mut ordered: Vec<&EewEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.current.event_id.cmp(&b.current.event_id));

    let mut intensity: BTreeMap<String, JmaIntensity> = BTreeMap::new();
    let mut warnings: Vec<WarningRegion> = Vec::new();

    for event in ordered {
        if event.current.is_canceled {
            continue;
        }

        for (code, range) in &event.current.regional_forecast {
            let Some(value) = range.merge_value() else {
                continue;
            };
            intensity
                .entry(code.clone())
                .and_modify(|existing| {
                    if value > *existing {
                        *existing = value;
                    }
                })
                .or_insert(value);
        }

        for region in &event.current.warning_regions {
            match warnings.iter_mut().find(|w| w.code == region.code) {
                // Last write wins on the display name for a code.
                Some(existing) => existing.name = region.name.clone(),
                None => warnings.push(region.clone()),
            }
        }
    }

    MergedView { intensity, warnings }
}
