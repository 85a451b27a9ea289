//! Display models and output formatters.
//!
//! One canonical display model serves both provider feeds; the engine's
//! normalized report shape means no per-provider formatting exists here.
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::engine::EngineConfig;
use crate::intensity::{self, JmaIntensity};
use crate::method::{intensity_override, EpicenterIcon, EstimationMethod};
use crate::report::Magnitude;
use crate::store::EewEvent;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Intensity-based colors
const RED: &str = "\x1b[91m"; // 6- and up
const YELLOW: &str = "\x1b[93m"; // 5- / 5+
const CYAN: &str = "\x1b[96m"; // 3 / 4
const WHITE: &str = "\x1b[97m"; // below 3 or unknown

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Epicenter marker for the renderer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarkerDisplay {
    pub lat: f64,
    pub lng: f64,
    pub icon: EpicenterIcon,
}

/// Per-event display model handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct EventDisplay {
    pub event_id: String,
    pub serial_no: String,
    pub method: EstimationMethod,
    pub method_label: &'static str,
    /// Canonical intensity string, including deep-focus / single-station
    /// overrides
    pub intensity: String,
    pub magnitude: String,
    pub depth_km: Option<f64>,
    pub hypocenter_name: String,
    /// Formatted origin time, or detection time when no origin exists
    pub time: Option<String>,
    pub is_canceled: bool,
    pub is_warning: bool,
    pub is_training: bool,
    pub is_last_info: bool,
    /// True when the estimate is low accuracy and the user has not opted in
    pub suppressed: bool,
    /// Absent when no valid epicenter exists or the estimate is suppressed
    pub marker: Option<MarkerDisplay>,
}

impl EventDisplay {
    /// Build the display model for one event.
    #[must_use]
    pub fn from_event(event: &EewEvent, config: &EngineConfig) -> Self {
        let report = &event.current;
        let method = report.method();
        let suppressed = method.is_low_accuracy() && !config.show_low_accuracy;

        let depth_km = report.hypocenter.depth_km;
        let intensity = match intensity_override(method, depth_km) {
            Some(text) => text.to_string(),
            None => {
                let (value, lower_bound_only) = max_forecast(report);
                intensity::to_display(value, lower_bound_only)
            }
        };

        let magnitude = match &report.magnitude {
            Magnitude::Value(v) => format!("M{v:.1}"),
            Magnitude::Condition(c) => c.clone(),
            Magnitude::Unknown => "M?".to_string(),
        };

        let time = report
            .origin_time
            .map(|t| format!("{} origin", t.format("%H:%M:%S")))
            .or_else(|| {
                report
                    .arrival_time
                    .map(|t| format!("{} detected", t.format("%H:%M:%S")))
            });

        let marker = if suppressed {
            None
        } else {
            event.epicenter.map(|e| MarkerDisplay {
                lat: e.lat,
                lng: e.lng,
                icon: e.icon,
            })
        };

        Self {
            event_id: report.event_id.clone(),
            serial_no: report.serial_no.clone(),
            method,
            method_label: method.as_str(),
            intensity,
            magnitude,
            depth_km,
            hypocenter_name: report.hypocenter.name.clone(),
            time,
            is_canceled: report.is_canceled,
            is_warning: report.is_warning,
            is_training: report.is_training,
            is_last_info: report.is_last_info,
            suppressed,
            marker,
        }
    }
}

/// Strongest forecast across the report's regions, with its lower-bound flag.
fn max_forecast(report: &crate::report::EewReport) -> (Option<JmaIntensity>, bool) {
    report
        .regional_forecast
        .values()
        .filter_map(|range| {
            let (value, lower) = range.display_value();
            value.map(|v| (v, lower))
        })
        .max_by_key(|(v, _)| v.rank())
        .map_or((None, false), |(v, lower)| (Some(v), lower))
}

/// Get the color code for an intensity class.
fn intensity_color(value: Option<JmaIntensity>) -> &'static str {
    match value {
        Some(v) if v >= JmaIntensity::Int6Lower => RED,
        Some(v) if v >= JmaIntensity::Int5Lower => YELLOW,
        Some(v) if v >= JmaIntensity::Int3 => CYAN,
        _ => WHITE,
    }
}

/// Write events in human-readable format with colors.
///
/// Suppressed (low-accuracy, no opt-in) events produce no row; the
/// structured formats keep them, flagged, for downstream filtering.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[EventDisplay]) -> io::Result<()> {
    for ev in events {
        if ev.suppressed {
            continue;
        }
        let value = ev
            .intensity
            .split_whitespace()
            .next()
            .and_then(JmaIntensity::from_code);
        let color = intensity_color(value);

        let canceled = if ev.is_canceled { " CANCELED" } else { "" };
        let warning = if ev.is_warning { " ⚠ WARNING" } else { "" };
        let training = if ev.is_training { " [drill]" } else { "" };
        let depth = ev
            .depth_km
            .map(|d| format!("{d:.0}km"))
            .unwrap_or_else(|| "?km".to_string());
        let time = ev.time.as_deref().unwrap_or("unknown time");

        writeln!(
            writer,
            "{color}{BOLD}#{serial:>2}{RESET} {color}int {intensity:12}{RESET} │ \
             {mag:5} │ {DIM}{depth:>6}{RESET} │ {time} │ \
             {place} {DIM}({method}){RESET}{BOLD}{warning}{canceled}{RESET}{training}",
            serial = ev.serial_no,
            intensity = ev.intensity,
            mag = ev.magnitude,
            place = ev.hypocenter_name,
            method = ev.method_label,
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[EventDisplay]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(events)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[EventDisplay]) -> io::Result<()> {
    for ev in events {
        let json = serde_json::to_string(ev)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[EventDisplay],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}

/// Write the merged situational view in human-readable form.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_merged_human<W: Write>(
    writer: &mut W,
    merged: &crate::merge::MergedView,
) -> io::Result<()> {
    if merged.is_empty() {
        return writeln!(writer, "{DIM}no active regions{RESET}");
    }
    let regions: Vec<String> = merged
        .intensity
        .iter()
        .map(|(code, int)| {
            let color = intensity_color(Some(*int));
            format!("{code}:{color}{}{RESET}", int.as_str())
        })
        .collect();
    writeln!(writer, "regions: {}", regions.join(" "))?;
    if !merged.warnings.is_empty() {
        let names: Vec<&str> = merged.warnings.iter().map(|w| w.name.as_str()).collect();
        writeln!(writer, "{BOLD}warning areas:{RESET} {}", names.join(", "))?;
    }
    Ok(())
}
