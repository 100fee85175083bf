//! Database operations for `harvest_runs`.
//!
//! A run moves `queued -> running -> succeeded | failed`; each transition
//! checks the current status and reports [`DbError::InvalidHarvestRunTransition`]
//! when the row is not where the caller expects.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `harvest_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HarvestRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub source_url: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_visited: i32,
    pub records_harvested: i32,
    pub stop_reason: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, source_url, status, started_at, completed_at, \
     pages_visited, records_harvested, stop_reason, error_message, created_at";

/// Creates a new harvest run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_harvest_run(pool: &PgPool, source_url: &str) -> Result<HarvestRunRow, DbError> {
    let row = sqlx::query_as::<_, HarvestRunRow>(&format!(
        "INSERT INTO harvest_runs (public_id, source_url, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(source_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidHarvestRunTransition`] if the run is not
/// `queued`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_harvest_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidHarvestRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` with its page and record counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidHarvestRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_harvest_run(
    pool: &PgPool,
    id: i64,
    pages_visited: i32,
    records_harvested: i32,
    stop_reason: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             pages_visited = $1, records_harvested = $2, stop_reason = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(pages_visited)
    .bind(records_harvested)
    .bind(stop_reason)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidHarvestRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidHarvestRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_harvest_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE harvest_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidHarvestRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_harvest_run(pool: &PgPool, id: i64) -> Result<HarvestRunRow, DbError> {
    let row = sqlx::query_as::<_, HarvestRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM harvest_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_harvest_runs(pool: &PgPool, limit: i64) -> Result<Vec<HarvestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, HarvestRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM harvest_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
