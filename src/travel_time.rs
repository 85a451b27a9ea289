//! Seismic travel-time table and P/S wavefront interpolation.
//!
//! The table is static reference data sampled at discrete depths: each row
//! gives the time for the P and S fronts to travel a given distance from a
//! hypocenter at that depth. Interpolation is linear in time at an exact
//! depth match; there is no depth interpolation.

use std::io::BufRead;
use std::path::Path;

use crate::errors::EewmonError;

/// Deepest hypocenter covered by the table.
pub const MAX_DEPTH_KM: f64 = 700.0;

/// Longest elapsed time covered by the table.
pub const MAX_ELAPSED_SECS: f64 = 2000.0;

/// One (depth, distance) sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelTimeRow {
    /// Seconds for the P front to reach `distance_km`
    pub p_time_s: f64,
    /// Seconds for the S front to reach `distance_km`
    pub s_time_s: f64,
    pub depth_km: i64,
    pub distance_km: i64,
}

/// Immutable travel-time table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TravelTimeTable {
    rows: Vec<TravelTimeRow>,
}

impl TravelTimeTable {
    #[must_use]
    pub fn new(rows: Vec<TravelTimeRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load a table from a whitespace-separated text file.
    ///
    /// Each non-comment line is `p_time s_time depth_km distance_km`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a row does not parse;
    /// the caller treats either as the table being unavailable for the
    /// session.
    pub fn load(path: &Path) -> Result<Self, EewmonError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a table from any buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an unparseable row.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EewmonError> {
        let mut rows = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            rows.push(parse_row(trimmed).map_err(|message| EewmonError::TableParse {
                line: idx + 1,
                message,
            })?);
        }
        Ok(Self::new(rows))
    }

    /// Interpolate P and S travel distances for a hypocenter depth and time
    /// elapsed since origin.
    ///
    /// Returns `(NaN, NaN)` outside the table domain or at a depth the table
    /// does not sample. Either component may be `NaN` independently when the
    /// elapsed time cannot be bracketed for that phase; `NaN` means "no
    /// wavefront to draw", not an error.
    #[must_use]
    pub fn interpolate(&self, depth_km: f64, elapsed_s: f64) -> (f64, f64) {
        if depth_km > MAX_DEPTH_KM || elapsed_s > MAX_ELAPSED_SECS {
            return (f64::NAN, f64::NAN);
        }
        // The table is pre-sampled at integer depths; fractional depths miss.
        let depth_rows: Vec<&TravelTimeRow> = self
            .rows
            .iter()
            .filter(|r| (r.depth_km as f64 - depth_km).abs() < f64::EPSILON)
            .collect();
        if depth_rows.is_empty() {
            return (f64::NAN, f64::NAN);
        }

        let p = interpolate_phase(&depth_rows, |r| r.p_time_s, elapsed_s);
        let s = interpolate_phase(&depth_rows, |r| r.s_time_s, elapsed_s);
        (p, s)
    }
}

/// Bracket `elapsed_s` between the greatest row time <= t and the smallest
/// row time >= t, then interpolate distance linearly. `NaN` when unbracketed.
fn interpolate_phase(
    rows: &[&TravelTimeRow],
    time_of: impl Fn(&TravelTimeRow) -> f64,
    elapsed_s: f64,
) -> f64 {
    let mut before: Option<&TravelTimeRow> = None;
    let mut after: Option<&TravelTimeRow> = None;

    for row in rows {
        let t = time_of(row);
        if t <= elapsed_s && before.is_none_or(|b| t > time_of(b)) {
            before = Some(row);
        }
        if t >= elapsed_s && after.is_none_or(|a| t < time_of(a)) {
            after = Some(row);
        }
    }

    let (Some(p1), Some(p2)) = (before, after) else {
        return f64::NAN;
    };

    let t1 = time_of(p1);
    let t2 = time_of(p2);
    let d1 = p1.distance_km as f64;
    let d2 = p2.distance_km as f64;

    // Equal bracket times: exact sample hit, no division.
    if (t2 - t1).abs() < f64::EPSILON {
        return d1;
    }
    d1 + (elapsed_s - t1) / (t2 - t1) * (d2 - d1)
}

fn parse_row(line: &str) -> Result<TravelTimeRow, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, got {}", fields.len()));
    }
    let p_time_s: f64 = fields[0]
        .parse()
        .map_err(|e| format!("bad p_time '{}': {e}", fields[0]))?;
    let s_time_s: f64 = fields[1]
        .parse()
        .map_err(|e| format!("bad s_time '{}': {e}", fields[1]))?;
    let depth_km: i64 = fields[2]
        .parse()
        .map_err(|e| format!("bad depth '{}': {e}", fields[2]))?;
    let distance_km: i64 = fields[3]
        .parse()
        .map_err(|e| format!("bad distance '{}': {e}", fields[3]))?;
    Ok(TravelTimeRow {
        p_time_s,
        s_time_s,
        depth_km,
        distance_km,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TravelTimeTable {
        TravelTimeTable::new(vec![
            TravelTimeRow { p_time_s: 10.0, s_time_s: 18.0, depth_km: 30, distance_km: 80 },
            TravelTimeRow { p_time_s: 20.0, s_time_s: 30.0, depth_km: 30, distance_km: 100 },
            TravelTimeRow { p_time_s: 12.0, s_time_s: 21.0, depth_km: 50, distance_km: 80 },
        ])
    }

    #[test]
    fn test_interpolation_between_rows() {
        let table = sample_table();
        let (p, s) = table.interpolate(30.0, 15.0);
        // 80 + (15-10)/(20-10) * (100-80) = 90
        assert!((p - 90.0).abs() < 1e-9);
        // S: 80 + (15-18) -> 15 < 18, unbracketed below; still bracketed?
        // s_times are 18 and 30; 15 is below both, so S is unbracketed.
        assert!(s.is_nan());
    }

    #[test]
    fn test_s_phase_interpolates_independently() {
        let table = sample_table();
        let (p, s) = table.interpolate(30.0, 24.0);
        // P: above both sample times? 24 is between 20 and 20.. no, p_times
        // are 10 and 20, 24 exceeds both: unbracketed above.
        assert!(p.is_nan());
        // S: 80 + (24-18)/(30-18) * 20 = 90
        assert!((s - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_domain_guards() {
        let table = sample_table();
        let (p, s) = table.interpolate(701.0, 15.0);
        assert!(p.is_nan() && s.is_nan());
        let (p, s) = table.interpolate(30.0, 2001.0);
        assert!(p.is_nan() && s.is_nan());
    }

    #[test]
    fn test_unsampled_depth_is_nan() {
        let table = sample_table();
        let (p, s) = table.interpolate(31.0, 15.0);
        assert!(p.is_nan() && s.is_nan());
    }

    #[test]
    fn test_exact_sample_hit() {
        let table = sample_table();
        let (p, _) = table.interpolate(30.0, 10.0);
        assert!((p - 80.0).abs() < 1e-9);
        let (p, _) = table.interpolate(30.0, 20.0);
        assert!((p - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_result_strictly_between_brackets() {
        let table = sample_table();
        for t in [11.0, 13.7, 19.9] {
            let (p, _) = table.interpolate(30.0, t);
            assert!(p > 80.0 && p < 100.0, "t={t} gave p={p}");
        }
    }

    #[test]
    fn test_parse_table_text() {
        let text = "# p s depth distance\n10.0 18.0 30 80\n20.0 30.0 30 100\n";
        let table =
            TravelTimeTable::from_reader(std::io::Cursor::new(text)).expect("parse");
        assert_eq!(table.len(), 2);
        let (p, _) = table.interpolate(30.0, 15.0);
        assert!((p - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_bad_row() {
        let text = "10.0 18.0 thirty 80\n";
        let err = TravelTimeTable::from_reader(std::io::Cursor::new(text));
        assert!(matches!(err, Err(EewmonError::TableParse { line: 1, .. })));
    }
}
