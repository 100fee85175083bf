//! Database operations for `insights`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `insights` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsightRow {
    pub id: i64,
    pub contractor_id: i64,
    pub insight_text: String,
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// An insight joined with the contractor it describes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsightWithContractorRow {
    pub id: i64,
    pub contractor_id: i64,
    pub contractor_name: String,
    pub rating: Option<f64>,
    pub insight_text: String,
    pub generated_at: DateTime<Utc>,
}

/// Stores a generated insight for a contractor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including an unknown
/// `contractor_id`).
pub async fn insert_insight(
    pool: &PgPool,
    contractor_id: i64,
    insight_text: &str,
    model: Option<&str>,
) -> Result<InsightRow, DbError> {
    let row = sqlx::query_as::<_, InsightRow>(
        "INSERT INTO insights (contractor_id, insight_text, model) \
         VALUES ($1, $2, $3) \
         RETURNING id, contractor_id, insight_text, model, generated_at",
    )
    .bind(contractor_id)
    .bind(insight_text)
    .bind(model)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns every insight with its contractor's name and rating, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_insights(pool: &PgPool) -> Result<Vec<InsightWithContractorRow>, DbError> {
    let rows = sqlx::query_as::<_, InsightWithContractorRow>(
        "SELECT i.id, i.contractor_id, c.name AS contractor_name, c.rating, \
                i.insight_text, i.generated_at \
         FROM insights i \
         JOIN contractors c ON c.id = i.contractor_id \
         ORDER BY i.generated_at, i.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
