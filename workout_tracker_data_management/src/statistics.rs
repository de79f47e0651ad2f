//! Aggregation over completed sessions: per-month totals for charting,
//! day and month summaries, and the filtered history listing.

use std::collections::BTreeMap;

use chrono::{Datelike, Local};

use workout_tracker_lib::{workout_session::WorkoutSession, workout_type::WorkoutType};

use crate::{SessionStore, StoreError, database::constants};

/// Which accumulated quantity an aggregation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Distance,
    Duration,
}

impl Metric {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Metric::Distance => constants::DISTANCE,
            Metric::Duration => constants::DURATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Year, month, day, hour, minute, all in the same direction.
    Chronological,
    Distance,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Restricts a session query. `None` fields match everything; the workout
/// type list is interpreted by the caller (see [`Statistics::list_sessions`]).
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub date: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub workout_types: Vec<WorkoutType>,
}

/// The period a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Day { year: i32, month: u32, date: u32 },
    Month { year: i32, month: u32 },
}

/// Totals over every session in a [`DateRange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total_distance_m: i64,
    pub total_duration_ms: i64,
    /// Total distance over total whole seconds, 0 when no time was recorded.
    pub average_pace_mps: f64,
}

/// Read-only statistics over a [`SessionStore`].
#[derive(Clone)]
pub struct Statistics {
    store: SessionStore,
}

impl Statistics {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Total of the chosen metric per month of the given year, keyed by the
    /// zero based month. Months without matching sessions are absent. An
    /// empty workout type list aggregates across all types.
    pub async fn monthly_totals(
        &self,
        year: i32,
        metric: Metric,
        workout_types: &[WorkoutType],
    ) -> Result<BTreeMap<u32, i64>, StoreError> {
        let totals = self.store.monthly_totals(year, metric, workout_types).await?;
        Ok(totals.into_iter().collect())
    }

    /// The largest monthly total of the year, 0 when nothing matches. Used
    /// to scale chart axes.
    pub async fn max_monthly_total(
        &self,
        year: i32,
        metric: Metric,
        workout_types: &[WorkoutType],
    ) -> Result<i64, StoreError> {
        self.store.max_monthly_total(year, metric, workout_types).await
    }

    /// Sums distance and duration over the sessions in the range. An empty
    /// workout type list means all types.
    pub async fn summary(
        &self,
        range: DateRange,
        workout_types: &[WorkoutType],
    ) -> Result<Summary, StoreError> {
        let filter = match range {
            DateRange::Day { year, month, date } => SessionFilter {
                date: Some(date),
                month: Some(month),
                year: Some(year),
                workout_types: workout_types.to_vec(),
            },
            DateRange::Month { year, month } => SessionFilter {
                date: None,
                month: Some(month),
                year: Some(year),
                workout_types: workout_types.to_vec(),
            },
        };
        let sessions = self
            .store
            .sessions(&filter, SortKey::Chronological, SortDirection::Ascending)
            .await?;

        let total_distance_m: i64 = sessions.iter().map(|session| session.distance_m).sum();
        let total_duration_ms: i64 = sessions.iter().map(|session| session.duration_ms).sum();
        let seconds = total_duration_ms / 1_000;
        let average_pace_mps = if seconds > 0 {
            total_distance_m as f64 / seconds as f64
        } else {
            0.0
        };
        Ok(Summary {
            total_distance_m,
            total_duration_ms,
            average_pace_mps,
        })
    }

    /// The earliest year with a recorded session, `None` for an empty store.
    pub async fn minimum_year(&self) -> Result<Option<i32>, StoreError> {
        self.store.minimum_year().await
    }

    /// Selectable years, newest first, from the current year back to the
    /// earliest recorded one. Empty when nothing is recorded yet.
    pub async fn year_range(&self) -> Result<Vec<i32>, StoreError> {
        let current_year = Local::now().year();
        Ok(match self.minimum_year().await? {
            Some(minimum) => (minimum..=current_year).rev().collect(),
            None => Vec::new(),
        })
    }

    /// Session history for display. Unlike the aggregations, an empty
    /// workout type list here means nothing is selected, so nothing is
    /// listed.
    pub async fn list_sessions(
        &self,
        filter: &SessionFilter,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Result<Vec<WorkoutSession>, StoreError> {
        if filter.workout_types.is_empty() {
            return Ok(Vec::new());
        }
        self.store.sessions(filter, sort_key, direction).await
    }
}

/// Vertical offset multiplier per displayed chart series, so overlapping
/// bars stay distinguishable. Series keep the fixed display order of
/// [`WorkoutType::ALL`] regardless of selection order.
pub fn series_offset_multipliers(selected: &[WorkoutType]) -> Vec<(WorkoutType, f32)> {
    let displayed: Vec<WorkoutType> = WorkoutType::ALL
        .into_iter()
        .filter(|workout_type| selected.contains(workout_type))
        .collect();
    let offsets: &[f32] = match displayed.len() {
        0 => &[],
        1 => &[0.0],
        2 => &[-1.0, 1.0],
        _ => &[-1.5, 0.0, 1.5],
    };
    displayed.into_iter().zip(offsets.iter().copied()).collect()
}
