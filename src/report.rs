//! Canonical EEW report shape and provider-specific normalizers.
//!
//! Two upstream feed formats are supported: a DMDATA-style telegram and an
//! IEDRED-style flat JSON feed. Both normalize into [`EewReport`] so the
//! engine never sees provider field names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EewmonError;
use crate::intensity::{IntensityBound, IntensityRange};
use crate::method::EstimationMethod;

/// Canonical condition string for a PLUM (hypothetical) hypocenter.
pub const HYPOTHETICAL_HYPOCENTER: &str = "hypothetical-hypocenter";

/// One normalized EEW bulletin. Immutable once built; newer serials for the
/// same event supersede (never merge with) older ones.
#[derive(Debug, Clone, Serialize)]
pub struct EewReport {
    pub event_id: String,
    /// Integer-like string, strictly increasing per event in normal operation.
    pub serial_no: String,
    pub is_canceled: bool,
    pub is_last_info: bool,
    pub is_warning: bool,
    /// Drill/test telegram flag.
    pub is_training: bool,
    pub origin_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub hypocenter: Hypocenter,
    pub magnitude: Magnitude,
    /// Region code -> forecast range.
    pub regional_forecast: BTreeMap<String, IntensityRange>,
    /// Present only on warning-class telegrams.
    pub warning_regions: Vec<WarningRegion>,
}

impl EewReport {
    /// Report time, falling back to arrival time when no origin time exists.
    #[must_use]
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.origin_time.or(self.arrival_time)
    }

    /// Classify the estimation method for this report.
    #[must_use]
    pub fn method(&self) -> EstimationMethod {
        EstimationMethod::classify(
            self.hypocenter.condition.as_deref(),
            &self.hypocenter.epicenter_accuracy_codes,
            self.origin_time.is_some(),
        )
    }

    /// Serial number as an ordinal, when it parses.
    #[must_use]
    pub fn serial_ordinal(&self) -> Option<u64> {
        self.serial_no.trim().parse().ok()
    }
}

/// Normalized hypocenter estimate. Any field may be absent on early serials.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Hypocenter {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub condition: Option<String>,
    pub epicenter_accuracy_codes: Vec<String>,
}

impl Hypocenter {
    /// Coordinates, only when both are present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Magnitude estimate: a value, or a textual condition when none exists yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Value(f64),
    Condition(String),
    Unknown,
}

/// One warning-area entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRegion {
    pub code: String,
    pub name: String,
}

// ============================================================================
// DMDATA-style telegram
// ============================================================================

/// Raw DMDATA-style EEW telegram body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmdataReport {
    pub event_id: String,
    pub serial_no: String,
    #[serde(default)]
    pub is_canceled: bool,
    #[serde(default)]
    pub is_last_info: bool,
    #[serde(default)]
    pub is_warning: bool,
    /// "訓練" or "試験" telegrams are drills.
    #[serde(default)]
    pub status: Option<String>,
    pub earthquake: Option<DmdataEarthquake>,
    pub intensity: Option<DmdataIntensity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmdataEarthquake {
    pub origin_time: Option<String>,
    pub arrival_time: Option<String>,
    pub hypocenter: Option<DmdataHypocenter>,
    pub magnitude: Option<DmdataMagnitude>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmdataHypocenter {
    #[serde(default)]
    pub name: String,
    pub coordinate: Option<DmdataCoordinate>,
    pub depth: Option<DmdataValue>,
    pub accuracy: Option<DmdataAccuracy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmdataCoordinate {
    pub latitude: Option<DmdataValue>,
    pub longitude: Option<DmdataValue>,
    pub condition: Option<String>,
}

/// DMDATA wraps scalars as `{"value": "35.5"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DmdataValue {
    pub value: Option<String>,
}

impl DmdataValue {
    fn as_f64(&self) -> Option<f64> {
        self.value.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmdataAccuracy {
    #[serde(default)]
    pub epicenters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmdataMagnitude {
    pub value: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmdataIntensity {
    #[serde(default)]
    pub regions: Vec<DmdataRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmdataRegion {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_warning: bool,
    pub forecast_max_int: Option<DmdataForecastInt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmdataForecastInt {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DmdataReport {
    /// Normalize into the canonical report shape.
    ///
    /// # Errors
    ///
    /// Returns an error only when the event id is missing; malformed numeric
    /// fields degrade to `None` rather than rejecting the report.
    pub fn normalize(self) -> Result<EewReport, EewmonError> {
        if self.event_id.is_empty() {
            return Err(EewmonError::MalformedReport("empty event id".into()));
        }

        let is_training = self
            .status
            .as_deref()
            .is_some_and(|s| s == "訓練" || s == "試験" || s.eq_ignore_ascii_case("training"));

        let (origin_time, arrival_time, hypocenter, magnitude) = match self.earthquake {
            Some(eq) => {
                let origin = eq.origin_time.as_deref().and_then(parse_time);
                let arrival = eq.arrival_time.as_deref().and_then(parse_time);
                let hypo = eq.hypocenter.map(normalize_dmdata_hypocenter).unwrap_or_default();
                let mag = match eq.magnitude {
                    Some(m) => match m.value.as_deref().and_then(|v| v.trim().parse().ok()) {
                        Some(v) => Magnitude::Value(v),
                        None => m.condition.map_or(Magnitude::Unknown, Magnitude::Condition),
                    },
                    None => Magnitude::Unknown,
                };
                (origin, arrival, hypo, mag)
            }
            None => (None, None, Hypocenter::default(), Magnitude::Unknown),
        };

        let mut regional_forecast = BTreeMap::new();
        let mut warning_regions = Vec::new();
        if let Some(intensity) = self.intensity {
            for region in intensity.regions {
                if let Some(range) = region.forecast_max_int.as_ref() {
                    let from = range
                        .from
                        .as_deref()
                        .map_or(IntensityBound::Unknown, IntensityBound::from_code);
                    let to = range
                        .to
                        .as_deref()
                        .map_or(IntensityBound::Unknown, IntensityBound::from_code);
                    regional_forecast
                        .insert(region.code.clone(), IntensityRange::new(from, to));
                }
                if region.is_warning {
                    warning_regions.push(WarningRegion {
                        code: region.code,
                        name: region.name,
                    });
                }
            }
        }

        Ok(EewReport {
            event_id: self.event_id,
            serial_no: self.serial_no,
            is_canceled: self.is_canceled,
            is_last_info: self.is_last_info,
            is_warning: self.is_warning,
            is_training,
            origin_time,
            arrival_time,
            hypocenter,
            magnitude,
            regional_forecast,
            warning_regions,
        })
    }
}

fn normalize_dmdata_hypocenter(raw: DmdataHypocenter) -> Hypocenter {
    let (latitude, longitude, condition) = match raw.coordinate {
        Some(coord) => (
            coord.latitude.as_ref().and_then(DmdataValue::as_f64),
            coord.longitude.as_ref().and_then(DmdataValue::as_f64),
            coord.condition.map(|c| normalize_condition(&c)),
        ),
        None => (None, None, None),
    };
    Hypocenter {
        name: raw.name,
        latitude,
        longitude,
        depth_km: raw.depth.as_ref().and_then(DmdataValue::as_f64),
        condition,
        epicenter_accuracy_codes: raw.accuracy.map(|a| a.epicenters).unwrap_or_default(),
    }
}

/// DMDATA flags a PLUM hypocenter in Japanese; map to the canonical string.
fn normalize_condition(condition: &str) -> String {
    if condition == "仮定震源要素" || condition == HYPOTHETICAL_HYPOCENTER {
        HYPOTHETICAL_HYPOCENTER.to_string()
    } else {
        condition.to_string()
    }
}

// ============================================================================
// IEDRED-style feed
// ============================================================================

/// Raw IEDRED-style flat EEW record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IedredReport {
    #[serde(rename = "EventID")]
    pub event_id: String,
    pub serial: u64,
    #[serde(default)]
    pub cancel: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub warn: bool,
    #[serde(default)]
    pub drill: bool,
    pub origin_time: Option<String>,
    pub announced_time: Option<String>,
    pub hypocenter: Option<IedredHypocenter>,
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub warn_areas: Vec<IedredWarnArea>,
    #[serde(default)]
    pub forecast: Vec<IedredForecast>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IedredHypocenter {
    #[serde(default)]
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub depth: Option<f64>,
    #[serde(default)]
    pub is_assumption: bool,
    #[serde(default)]
    pub accuracy: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IedredWarnArea {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IedredForecast {
    pub code: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl IedredReport {
    /// Normalize into the canonical report shape.
    ///
    /// # Errors
    ///
    /// Returns an error only when the event id is missing.
    pub fn normalize(self) -> Result<EewReport, EewmonError> {
        if self.event_id.is_empty() {
            return Err(EewmonError::MalformedReport("empty event id".into()));
        }

        let hypocenter = match self.hypocenter {
            Some(h) => Hypocenter {
                name: h.name,
                latitude: h.lat.filter(|v| v.is_finite()),
                longitude: h.lon.filter(|v| v.is_finite()),
                depth_km: h.depth.filter(|v| v.is_finite()),
                condition: h.is_assumption.then(|| HYPOTHETICAL_HYPOCENTER.to_string()),
                epicenter_accuracy_codes: h.accuracy,
            },
            None => Hypocenter::default(),
        };

        let mut regional_forecast = BTreeMap::new();
        for entry in self.forecast {
            let from = entry
                .from
                .as_deref()
                .map_or(IntensityBound::Unknown, IntensityBound::from_code);
            let to = entry
                .to
                .as_deref()
                .map_or(IntensityBound::Unknown, IntensityBound::from_code);
            regional_forecast.insert(entry.code, IntensityRange::new(from, to));
        }

        Ok(EewReport {
            event_id: self.event_id,
            serial_no: self.serial.to_string(),
            is_canceled: self.cancel,
            is_last_info: self.is_final,
            is_warning: self.warn,
            is_training: self.drill,
            origin_time: self.origin_time.as_deref().and_then(parse_time),
            arrival_time: self.announced_time.as_deref().and_then(parse_time),
            hypocenter,
            magnitude: self.magnitude.map_or(Magnitude::Unknown, Magnitude::Value),
            regional_forecast,
            warning_regions: self
                .warn_areas
                .into_iter()
                .map(|a| WarningRegion { code: a.code, name: a.name })
                .collect(),
        })
    }
}

/// Which upstream feed format a raw record is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Dmdata,
    Iedred,
}

impl Provider {
    /// Decode one raw JSON record and normalize it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not parse as this provider's shape
    /// or the record is missing its event id.
    pub fn decode(self, json: &str) -> Result<EewReport, EewmonError> {
        match self {
            Self::Dmdata => serde_json::from_str::<DmdataReport>(json)?.normalize(),
            Self::Iedred => serde_json::from_str::<IedredReport>(json)?.normalize(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dmdata => "dmdata",
            Self::Iedred => "iedred",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dmdata" => Ok(Self::Dmdata),
            "iedred" => Ok(Self::Iedred),
            _ => Err(format!("unknown provider: {s} (expected: dmdata, iedred)")),
        }
    }
}

/// Parse an RFC 3339 timestamp, tolerating a trailing missing offset.
fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::JmaIntensity;
    use crate::method::EstimationMethod;

    const DMDATA_SAMPLE: &str = r#"{
        "eventId": "20260829123456",
        "serialNo": "3",
        "isWarning": true,
        "earthquake": {
            "originTime": "2026-08-29T12:34:56+09:00",
            "arrivalTime": "2026-08-29T12:35:01+09:00",
            "hypocenter": {
                "name": "Off Sanriku",
                "coordinate": {
                    "latitude": {"value": "39.0"},
                    "longitude": {"value": "142.5"}
                },
                "depth": {"value": "50"},
                "accuracy": {"epicenters": ["3", "4"]}
            },
            "magnitude": {"value": "6.1"}
        },
        "intensity": {
            "regions": [
                {"code": "220", "name": "Iwate Engan Nanbu", "isWarning": true,
                 "forecastMaxInt": {"from": "4", "to": "5-"}},
                {"code": "221", "name": "Iwate Engan Hokubu", "isWarning": false,
                 "forecastMaxInt": {"from": "3", "to": "over"}}
            ]
        }
    }"#;

    #[test]
    fn test_dmdata_normalize() {
        let raw: DmdataReport = serde_json::from_str(DMDATA_SAMPLE).expect("parse");
        let report = raw.normalize().expect("normalize");

        assert_eq!(report.event_id, "20260829123456");
        assert_eq!(report.serial_ordinal(), Some(3));
        assert!(report.is_warning);
        assert!(!report.is_canceled);
        assert!(report.origin_time.is_some());
        assert_eq!(report.hypocenter.coordinates(), Some((39.0, 142.5)));
        assert_eq!(report.hypocenter.depth_km, Some(50.0));
        assert_eq!(report.magnitude, Magnitude::Value(6.1));
        assert_eq!(report.method(), EstimationMethod::Ipf3Plus);

        let range = report.regional_forecast.get("220").expect("region 220");
        assert_eq!(range.merge_value(), Some(JmaIntensity::Int5Lower));
        let open = report.regional_forecast.get("221").expect("region 221");
        assert_eq!(open.display_value(), (Some(JmaIntensity::Int3), true));

        assert_eq!(report.warning_regions.len(), 1);
        assert_eq!(report.warning_regions[0].code, "220");
    }

    #[test]
    fn test_dmdata_plum_condition_is_canonicalized() {
        let json = r#"{
            "eventId": "e1", "serialNo": "1",
            "earthquake": {
                "originTime": "2026-08-29T12:00:00Z",
                "hypocenter": {
                    "name": "",
                    "coordinate": {"condition": "仮定震源要素"}
                }
            }
        }"#;
        let raw: DmdataReport = serde_json::from_str(json).expect("parse");
        let report = raw.normalize().expect("normalize");
        assert_eq!(
            report.hypocenter.condition.as_deref(),
            Some(HYPOTHETICAL_HYPOCENTER)
        );
        assert_eq!(report.method(), EstimationMethod::Plum);
    }

    #[test]
    fn test_dmdata_bad_numeric_degrades_not_rejects() {
        let json = r#"{
            "eventId": "e2", "serialNo": "1",
            "earthquake": {
                "hypocenter": {
                    "name": "x",
                    "coordinate": {"latitude": {"value": "not-a-number"}},
                    "depth": {"value": ""}
                }
            }
        }"#;
        let raw: DmdataReport = serde_json::from_str(json).expect("parse");
        let report = raw.normalize().expect("normalize");
        assert_eq!(report.hypocenter.latitude, None);
        assert_eq!(report.hypocenter.depth_km, None);
        assert_eq!(report.hypocenter.coordinates(), None);
    }

    #[test]
    fn test_iedred_normalize() {
        let json = r#"{
            "EventID": "20260829990000",
            "Serial": 2,
            "Warn": true,
            "OriginTime": "2026-08-29T03:00:00Z",
            "AnnouncedTime": "2026-08-29T03:00:05Z",
            "Hypocenter": {"Name": "Hyuganada", "Lat": 32.0, "Lon": 132.0,
                           "Depth": 30.0, "Accuracy": ["2"]},
            "Magnitude": 5.5,
            "WarnAreas": [{"Code": "550", "Name": "Miyazaki"}],
            "Forecast": [{"Code": "550", "From": "4", "To": "4"}]
        }"#;
        let raw: IedredReport = serde_json::from_str(json).expect("parse");
        let report = raw.normalize().expect("normalize");

        assert_eq!(report.serial_no, "2");
        assert_eq!(report.method(), EstimationMethod::Ipf2);
        assert_eq!(report.hypocenter.coordinates(), Some((32.0, 132.0)));
        assert_eq!(report.warning_regions[0].name, "Miyazaki");
        assert_eq!(
            report.regional_forecast.get("550").map(IntensityRange::merge_value),
            Some(Some(JmaIntensity::Int4))
        );
    }

    #[test]
    fn test_provider_round_trip() {
        for provider in [Provider::Dmdata, Provider::Iedred] {
            let parsed: Provider = provider.as_str().parse().expect("parse");
            assert_eq!(parsed, provider);
        }
        assert!("wolfx".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_decode_dispatch() {
        let report = Provider::Dmdata.decode(DMDATA_SAMPLE).expect("decode");
        assert_eq!(report.event_id, "20260829123456");
        assert!(Provider::Iedred.decode(DMDATA_SAMPLE).is_err());
    }

    #[test]
    fn test_effective_time_falls_back_to_arrival() {
        let json = r#"{
            "EventID": "e3", "Serial": 1,
            "AnnouncedTime": "2026-08-29T03:00:05Z"
        }"#;
        let raw: IedredReport = serde_json::from_str(json).expect("parse");
        let report = raw.normalize().expect("normalize");
        assert!(report.origin_time.is_none());
        assert_eq!(report.effective_time(), report.arrival_time);
        // No origin time and no accuracy codes: level trigger.
        assert_eq!(report.method(), EstimationMethod::Level);
    }
}
