//! JMA seismic intensity scale.
//!
//! Ten ordered intensity classes (0 through 7, with split 5/6 ranks) plus
//! sentinels for unknown and lower-bound-only forecasts. Ordering follows
//! declaration order, so `Ord` comparisons give the ordinal rank directly.

use serde::{Deserialize, Serialize};

/// A discrete JMA intensity class.
///
/// Higher variants are stronger shaking. `Unknown` is deliberately not a
/// variant here: absence of a known class is modeled by `IntensityBound`
/// so it can never masquerade as intensity 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JmaIntensity {
    #[serde(rename = "0")]
    Int0,
    #[serde(rename = "1")]
    Int1,
    #[serde(rename = "2")]
    Int2,
    #[serde(rename = "3")]
    Int3,
    #[serde(rename = "4")]
    Int4,
    #[serde(rename = "5-")]
    Int5Lower,
    #[serde(rename = "5+")]
    Int5Upper,
    #[serde(rename = "6-")]
    Int6Lower,
    #[serde(rename = "6+")]
    Int6Upper,
    #[serde(rename = "7")]
    Int7,
}

impl JmaIntensity {
    /// Parse a provider intensity code (e.g. `"5-"`, `"7"`).
    ///
    /// Returns `None` for `"unknown"`, `"over"`, or anything unrecognized;
    /// callers decide whether that means `Unknown` or `Over`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Int0),
            "1" => Some(Self::Int1),
            "2" => Some(Self::Int2),
            "3" => Some(Self::Int3),
            "4" => Some(Self::Int4),
            "5-" => Some(Self::Int5Lower),
            "5+" => Some(Self::Int5Upper),
            "6-" => Some(Self::Int6Lower),
            "6+" => Some(Self::Int6Upper),
            "7" => Some(Self::Int7),
            _ => None,
        }
    }

    /// Display label for this class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int0 => "0",
            Self::Int1 => "1",
            Self::Int2 => "2",
            Self::Int3 => "3",
            Self::Int4 => "4",
            Self::Int5Lower => "5-",
            Self::Int5Upper => "5+",
            Self::Int6Lower => "6-",
            Self::Int6Upper => "6+",
            Self::Int7 => "7",
        }
    }

    /// Ordinal rank (0..=9), used in merge comparisons.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

/// One bound of a regional intensity forecast.
///
/// Providers report `from`/`to` pairs where either side may be unknown and
/// the upper side may be open-ended (`over`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityBound {
    Known(JmaIntensity),
    /// Upper bound open: "this level or higher"
    Over,
    Unknown,
}

impl IntensityBound {
    /// Parse a provider bound code (`"over"`, `"unknown"`, or a class code).
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "over" => Self::Over,
            "unknown" | "不明" => Self::Unknown,
            other => JmaIntensity::from_code(other).map_or(Self::Unknown, Self::Known),
        }
    }
}

/// A regional forecast range `{from, to}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityRange {
    pub from: IntensityBound,
    pub to: IntensityBound,
}

impl IntensityRange {
    #[must_use]
    pub const fn new(from: IntensityBound, to: IntensityBound) -> Self {
        Self { from, to }
    }

    /// The class this range contributes to display and merging, plus whether
    /// it is only a lower bound (`to == over`).
    ///
    /// Merging must compare the returned class, never the annotated label.
    #[must_use]
    pub fn display_value(&self) -> (Option<JmaIntensity>, bool) {
        match self.to {
            IntensityBound::Known(to) => (Some(to), false),
            IntensityBound::Over => match self.from {
                IntensityBound::Known(from) => (Some(from), true),
                _ => (None, false),
            },
            IntensityBound::Unknown => match self.from {
                IntensityBound::Known(from) => (Some(from), false),
                _ => (None, false),
            },
        }
    }

    /// The class used in ordinal max-merges; `None` never wins over a known
    /// rank.
    #[must_use]
    pub fn merge_value(&self) -> Option<JmaIntensity> {
        self.display_value().0
    }
}

/// Convert an intensity class (or its absence) to a display label.
///
/// Lower-bound-only values are annotated "or higher"; unknown renders as
/// "unknown", never coerced to "0".
#[must_use]
pub fn to_display(value: Option<JmaIntensity>, lower_bound_only: bool) -> String {
    match value {
        None => "unknown".to_string(),
        Some(v) if lower_bound_only => format!("{} or higher", v.as_str()),
        Some(v) => v.as_str().to_string(),
    }
}
