//! Estimation-method classification.
//!
//! Maps a report's hypocenter condition and epicenter accuracy codes to the
//! method that produced the estimate. The tag drives low-accuracy filtering,
//! epicenter icon selection, and display-copy overrides.

use serde::Serialize;

/// Depth beyond which no reliable intensity forecast exists (deep focus).
pub const DEEP_FOCUS_KM: f64 = 150.0;

/// Hypocenter condition string marking a PLUM (hypothetical) hypocenter.
const PLUM_CONDITION: &str = "hypothetical-hypocenter";

/// How a report's hypocenter/intensity estimate was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    /// PLUM: propagation of observed intensity, hypothetical hypocenter
    Plum,
    /// Level trigger: a station exceeded a threshold, no origin time yet
    Level,
    /// IPF with a single station
    Ipf1,
    /// IPF with two stations
    Ipf2,
    /// IPF with three or more stations
    Ipf3Plus,
    Unknown,
}

impl EstimationMethod {
    /// Classify from the hypocenter condition, accuracy codes, and whether
    /// an origin time is present. Rules are evaluated in order.
    #[must_use]
    pub fn classify(
        condition: Option<&str>,
        epicenter_accuracy_codes: &[String],
        has_origin_time: bool,
    ) -> Self {
        if condition == Some(PLUM_CONDITION) {
            return Self::Plum;
        }

        let fallback = if has_origin_time { Self::Unknown } else { Self::Level };

        let Some(first) = epicenter_accuracy_codes.first() else {
            return fallback;
        };
        match first.trim().parse::<u8>() {
            Ok(1) => {
                if has_origin_time {
                    Self::Ipf1
                } else {
                    Self::Level
                }
            }
            Ok(2) => Self::Ipf2,
            Ok(3 | 4) => Self::Ipf3Plus,
            _ => fallback,
        }
    }

    /// Low-accuracy methods are suppressed from display and epicenter
    /// plotting unless the user opts in.
    #[must_use]
    pub const fn is_low_accuracy(self) -> bool {
        matches!(self, Self::Plum | Self::Level | Self::Ipf1)
    }

    /// Which epicenter marker to draw for this method.
    #[must_use]
    pub const fn icon_kind(self) -> EpicenterIcon {
        match self {
            Self::Plum | Self::Level => EpicenterIcon::Assumed,
            _ => EpicenterIcon::Confirmed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plum => "PLUM",
            Self::Level => "level",
            Self::Ipf1 => "IPF (1 station)",
            Self::Ipf2 => "IPF (2 stations)",
            Self::Ipf3Plus => "IPF (3+ stations)",
            Self::Unknown => "unknown",
        }
    }
}

/// Epicenter marker icon selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicenterIcon {
    /// Assumed hypocenter (PLUM / level trigger)
    Assumed,
    /// Confirmed hypocenter
    Confirmed,
}

/// Display-copy override for unreliable intensity forecasts.
///
/// Deep-focus events (depth > 150 km) have no reliable forecast regardless
/// of method; single-station IPF likewise.
#[must_use]
pub fn intensity_override(
    method: EstimationMethod,
    depth_km: Option<f64>,
) -> Option<&'static str> {
    if depth_km.is_some_and(|d| d > DEEP_FOCUS_KM) {
        return Some("no reliable intensity (deep focus)");
    }
    if method == EstimationMethod::Ipf1 {
        return Some("single station, no reliable intensity");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_plum_wins_over_accuracy_codes() {
        let method = EstimationMethod::classify(
            Some("hypothetical-hypocenter"),
            &codes(&["3"]),
            true,
        );
        assert_eq!(method, EstimationMethod::Plum);
    }

    #[test]
    fn test_accuracy_code_one() {
        let m = EstimationMethod::classify(None, &codes(&["1"]), true);
        assert_eq!(m, EstimationMethod::Ipf1);
        let m = EstimationMethod::classify(None, &codes(&["1"]), false);
        assert_eq!(m, EstimationMethod::Level);
    }

    #[test]
    fn test_accuracy_code_two_ignores_origin_time() {
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["2"]), true),
            EstimationMethod::Ipf2
        );
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["2", "9"]), false),
            EstimationMethod::Ipf2
        );
    }

    #[test]
    fn test_accuracy_codes_three_and_four() {
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["3"]), true),
            EstimationMethod::Ipf3Plus
        );
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["4"]), false),
            EstimationMethod::Ipf3Plus
        );
    }

    #[test]
    fn test_unparseable_code_falls_back() {
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["9"]), true),
            EstimationMethod::Unknown
        );
        assert_eq!(
            EstimationMethod::classify(None, &codes(&["x"]), false),
            EstimationMethod::Level
        );
    }

    #[test]
    fn test_no_codes() {
        assert_eq!(
            EstimationMethod::classify(None, &[], true),
            EstimationMethod::Unknown
        );
        assert_eq!(
            EstimationMethod::classify(None, &[], false),
            EstimationMethod::Level
        );
    }

    #[test]
    fn test_low_accuracy_set() {
        assert!(EstimationMethod::Plum.is_low_accuracy());
        assert!(EstimationMethod::Level.is_low_accuracy());
        assert!(EstimationMethod::Ipf1.is_low_accuracy());
        assert!(!EstimationMethod::Ipf2.is_low_accuracy());
        assert!(!EstimationMethod::Ipf3Plus.is_low_accuracy());
    }

    #[test]
    fn test_icon_kind() {
        assert_eq!(EstimationMethod::Plum.icon_kind(), EpicenterIcon::Assumed);
        assert_eq!(EstimationMethod::Level.icon_kind(), EpicenterIcon::Assumed);
        assert_eq!(EstimationMethod::Ipf2.icon_kind(), EpicenterIcon::Confirmed);
        assert_eq!(EstimationMethod::Unknown.icon_kind(), EpicenterIcon::Confirmed);
    }

    #[test]
    fn test_deep_focus_override_beats_method() {
        let text = intensity_override(EstimationMethod::Ipf3Plus, Some(200.0));
        assert_eq!(text, Some("no reliable intensity (deep focus)"));
        // At exactly 150 km the forecast is still considered usable.
        assert_eq!(intensity_override(EstimationMethod::Ipf3Plus, Some(150.0)), None);
    }

    #[test]
    fn test_single_station_override() {
        let text = intensity_override(EstimationMethod::Ipf1, Some(30.0));
        assert_eq!(text, Some("single station, no reliable intensity"));
    }
}
