use std::path::Path;

use const_format::concatcp;
use sqlx::{
    Executor, QueryBuilder, Row, Sqlite, SqlitePool, query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use workout_tracker_lib::{workout_session::WorkoutSession, workout_type::WorkoutType};

use crate::{
    StoreError,
    database::constants::*,
    statistics::{Metric, SessionFilter, SortDirection, SortKey},
};

/// SQLite-backed store for completed workout sessions.
#[derive(Clone)]
pub struct SessionDatabase {
    pool: SqlitePool,
}

impl SessionDatabase {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// A single connection keeps every query on the same in-memory database.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(":memory:"))
            .await?;
        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.pool
            .execute(concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                SESSIONS_TABLE_NAME,
                "(",
                ID, " INTEGER PRIMARY KEY AUTOINCREMENT,",
                DATE, " INTEGER NOT NULL,",
                MONTH, " INTEGER NOT NULL,",
                YEAR, " INTEGER NOT NULL,",
                HOUR, " INTEGER NOT NULL,",
                MINUTE, " INTEGER NOT NULL,",
                DURATION, " INTEGER NOT NULL,",
                DISTANCE, " INTEGER NOT NULL,",
                WORKOUT_TYPE, " INTEGER NOT NULL,",
                LATITUDE, " TEXT NOT NULL,",
                LONGITUDE, " TEXT NOT NULL",
                ")"
            ))
            .await?;
        Ok(())
    }

    /// Inserts a session and returns its assigned id. Ids are assigned by
    /// the database and grow monotonically.
    pub async fn insert_session(&self, session: &WorkoutSession) -> Result<i64, StoreError> {
        let (id,) = query_as::<_, (i64,)>(concatcp!(
            "INSERT INTO ",
            SESSIONS_TABLE_NAME,
            "(",
            ID, ", ", DATE, ", ", MONTH, ", ", YEAR, ", ", HOUR, ", ", MINUTE, ", ",
            DURATION, ", ", DISTANCE, ", ", WORKOUT_TYPE, ", ", LATITUDE, ", ", LONGITUDE,
            ") VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING ",
            ID
        ))
        .bind(session.date)
        .bind(session.month)
        .bind(session.year)
        .bind(session.hour)
        .bind(session.minute)
        .bind(session.duration_ms)
        .bind(session.distance_m)
        .bind(session.workout_type.id())
        .bind(&session.latitudes)
        .bind(&session.longitudes)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get_session(&self, session_id: i64) -> Result<Option<WorkoutSession>, StoreError> {
        let row = query(concatcp!(
            "SELECT * FROM ", SESSIONS_TABLE_NAME, " WHERE ", ID, " = ?1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row))
    }

    pub async fn delete_session(&self, session_id: i64) -> Result<(), StoreError> {
        query(concatcp!(
            "DELETE FROM ", SESSIONS_TABLE_NAME, " WHERE ", ID, " = ?1"
        ))
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sessions matching the filter in the requested order. An empty workout
    /// type list places no restriction on the type.
    pub async fn query_sessions(
        &self,
        filter: &SessionFilter,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Result<Vec<WorkoutSession>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(concatcp!("SELECT * FROM ", SESSIONS_TABLE_NAME));

        let mut prefix = " WHERE ";
        if let Some(year) = filter.year {
            builder.push(prefix).push(YEAR).push(" = ").push_bind(year);
            prefix = " AND ";
        }
        if let Some(month) = filter.month {
            builder.push(prefix).push(MONTH).push(" = ").push_bind(month);
            prefix = " AND ";
        }
        if let Some(date) = filter.date {
            builder.push(prefix).push(DATE).push(" = ").push_bind(date);
            prefix = " AND ";
        }
        push_workout_type_filter(&mut builder, prefix, &filter.workout_types);

        let order = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        builder.push(" ORDER BY ");
        match sort_key {
            SortKey::Chronological => {
                let mut columns = builder.separated(", ");
                for column in [YEAR, MONTH, DATE, HOUR, MINUTE] {
                    columns.push(format!("{column} {order}"));
                }
            }
            SortKey::Distance => {
                builder.push(DISTANCE).push(" ").push(order);
            }
            SortKey::Duration => {
                builder.push(DURATION).push(" ").push(order);
            }
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(session_from_row).collect())
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
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        builder
            .push(MONTH)
            .push(", SUM(")
            .push(metric.column())
            .push(concatcp!(
                ") AS ", MONTHLY_TOTAL, " FROM ", SESSIONS_TABLE_NAME, " WHERE ", YEAR, " = "
            ))
            .push_bind(year);
        push_workout_type_filter(&mut builder, " AND ", workout_types);
        builder.push(concatcp!(" GROUP BY ", MONTH));

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (row.get(MONTH), row.get(MONTHLY_TOTAL)))
            .collect())
    }

    /// The largest per-month total of the chosen metric for one year, or 0
    /// when no session matches.
    pub async fn max_monthly_total(
        &self,
        year: i32,
        metric: Metric,
        workout_types: &[WorkoutType],
    ) -> Result<i64, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(concatcp!(
            "SELECT MAX(", MONTHLY_TOTAL, ") FROM (SELECT SUM("
        ));
        builder
            .push(metric.column())
            .push(concatcp!(
                ") AS ", MONTHLY_TOTAL, " FROM ", SESSIONS_TABLE_NAME, " WHERE ", YEAR, " = "
            ))
            .push_bind(year);
        push_workout_type_filter(&mut builder, " AND ", workout_types);
        builder.push(concatcp!(" GROUP BY ", MONTH, ")"));

        let row = builder.build().fetch_one(&self.pool).await?;
        let max: Option<i64> = row.get(0);
        Ok(max.unwrap_or(0))
    }

    /// Closes the connection pool. Every operation afterwards fails with a
    /// database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// The earliest year with a recorded session, `None` for an empty store.
    pub async fn minimum_year(&self) -> Result<Option<i32>, StoreError> {
        let (minimum,) = query_as::<_, (Option<i64>,)>(concatcp!(
            "SELECT MIN(", YEAR, ") FROM ", SESSIONS_TABLE_NAME
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(minimum.map(|year| year as i32))
    }
}

fn push_workout_type_filter(
    builder: &mut QueryBuilder<'_, Sqlite>,
    prefix: &str,
    workout_types: &[WorkoutType],
) {
    if workout_types.is_empty() {
        return;
    }
    builder.push(prefix).push(WORKOUT_TYPE).push(" IN (");
    let mut separated = builder.separated(", ");
    for workout_type in workout_types {
        separated.push_bind(workout_type.id());
    }
    builder.push(")");
}

fn session_from_row(row: &SqliteRow) -> WorkoutSession {
    WorkoutSession {
        id: row.get(ID),
        date: row.get(DATE),
        month: row.get(MONTH),
        year: row.get(YEAR),
        hour: row.get(HOUR),
        minute: row.get(MINUTE),
        duration_ms: row.get(DURATION),
        distance_m: row.get(DISTANCE),
        workout_type: WorkoutType::from_id(row.get(WORKOUT_TYPE)).unwrap_or_default(),
        latitudes: row.get(LATITUDE),
        longitudes: row.get(LONGITUDE),
    }
}
