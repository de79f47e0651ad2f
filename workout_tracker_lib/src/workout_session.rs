use serde::{Deserialize, Serialize};

use crate::workout_type::WorkoutType;

/// A completed activity session, one row of the session database.
///
/// The calendar fields are stored separately rather than as a timestamp, and
/// the route is kept as two semicolon-joined coordinate strings, because that
/// is the layout existing databases already use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: i64,
    /// Day of month, 1-31.
    pub date: u32,
    /// Zero based: January is 0, December is 11.
    pub month: u32,
    pub year: i32,
    pub hour: u32,
    pub minute: u32,
    pub duration_ms: i64,
    pub distance_m: i64,
    pub workout_type: WorkoutType,
    pub latitudes: String,
    pub longitudes: String,
}

impl WorkoutSession {
    /// Average pace in metres per second over the whole session. Sessions
    /// shorter than a second report 0.
    pub fn average_pace_mps(&self) -> f64 {
        let seconds = self.duration_ms / 1_000;
        if seconds > 0 {
            self.distance_m as f64 / seconds as f64
        } else {
            0.0
        }
    }

    /// The decoded route as (latitude, longitude) pairs, or `None` when the
    /// session has no usable route: either coordinate string is empty or
    /// malformed, or the two sides disagree on length.
    pub fn route(&self) -> Option<Vec<(f64, f64)>> {
        let latitudes = split_coordinates(&self.latitudes)?;
        let longitudes = split_coordinates(&self.longitudes)?;
        if latitudes.len() != longitudes.len() {
            return None;
        }
        Some(latitudes.into_iter().zip(longitudes).collect())
    }
}

/// Joins coordinates into the storage format: every value followed by a
/// semicolon, including the last. Formatting with `{:?}` keeps the `.0` on
/// whole numbers, so stored strings stay identical to existing rows.
pub fn join_coordinates(coordinates: &[f64]) -> String {
    coordinates
        .iter()
        .map(|coordinate| format!("{coordinate:?};"))
        .collect()
}

/// Inverse of [`join_coordinates`]. An empty string or any unparsable
/// segment yields `None`.
pub fn split_coordinates(joined: &str) -> Option<Vec<f64>> {
    if joined.is_empty() {
        return None;
    }
    joined
        .split_terminator(';')
        .map(|value| value.parse::<f64>().ok())
        .collect()
}
