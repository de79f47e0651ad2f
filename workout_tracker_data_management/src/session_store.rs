use std::path::Path;

use tracing::info;

use workout_tracker_lib::{workout_session::WorkoutSession, workout_type::WorkoutType};

use crate::{
    StoreError,
    database::SessionDatabase,
    statistics::{Metric, SessionFilter, SortDirection, SortKey},
};

/// The public interface for workout session persistence.
#[derive(Clone)]
pub struct SessionStore {
    database: SessionDatabase,
}

impl SessionStore {
    /// Opens the store at the given path, creating parent directories and
    /// the database file when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let database = SessionDatabase::connect(path).await?;
        info!("session store opened at {}", path.display());
        Ok(Self { database })
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let database = SessionDatabase::connect_in_memory().await?;
        Ok(Self { database })
    }

    /// Closes the underlying pool. Every operation afterwards fails with a
    /// database error.
    pub async fn close(&self) {
        self.database.close().await;
    }

    pub async fn insert_session(&self, session: &WorkoutSession) -> Result<i64, StoreError> {
        self.database.insert_session(session).await
    }

    pub async fn get_session(&self, session_id: i64) -> Result<Option<WorkoutSession>, StoreError> {
        self.database.get_session(session_id).await
    }

    pub async fn delete_session(&self, session_id: i64) -> Result<(), StoreError> {
        self.database.delete_session(session_id).await
    }

    /// All sessions matching the filter in the requested order. An empty
    /// workout type list places no restriction on the type.
    pub async fn sessions(
        &self,
        filter: &SessionFilter,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Result<Vec<WorkoutSession>, StoreError> {
        self.database.query_sessions(filter, sort_key, direction).await
    }

    /// Per-month totals of the chosen metric for one year, only months with
    /// at least one matching session present. An empty workout type list
    /// aggregates across all types.
    pub async fn monthly_totals(
        &self,
        year: i32,
        metric: Metric,
        workout_types: &[WorkoutType],
    ) -> Result<Vec<(u32, i64)>, StoreError> {
        self.database.monthly_totals(year, metric, workout_types).await
    }

    /// The largest per-month total of the chosen metric for one year, or 0
    /// when no session matches.
    pub async fn max_monthly_total(
        &self,
        year: i32,
        metric: Metric,
        workout_types: &[WorkoutType],
    ) -> Result<i64, StoreError> {
        self.database.max_monthly_total(year, metric, workout_types).await
    }

    /// The earliest year with a recorded session, `None` for an empty store.
    pub async fn minimum_year(&self) -> Result<Option<i32>, StoreError> {
        self.database.minimum_year().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn facade_exposes_the_aggregation_queries() {
        let store = SessionStore::open_in_memory().await.unwrap();
        assert_eq!(store.minimum_year().await.unwrap(), None);

        let session = WorkoutSession {
            id: 0,
            date: 1,
            month: 2,
            year: 2024,
            hour: 6,
            minute: 0,
            duration_ms: 60_000,
            distance_m: 250,
            workout_type: WorkoutType::Running,
            latitudes: String::new(),
            longitudes: String::new(),
        };
        store.insert_session(&session).await.unwrap();

        assert_eq!(
            store.monthly_totals(2024, Metric::Distance, &[]).await.unwrap(),
            vec![(2, 250)]
        );
        assert_eq!(
            store.max_monthly_total(2024, Metric::Duration, &[]).await.unwrap(),
            60_000
        );
        assert_eq!(store.minimum_year().await.unwrap(), Some(2024));
    }
}
