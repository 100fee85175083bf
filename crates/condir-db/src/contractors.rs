//! Database operations for `contractors`, `certifications`, and `services`.

use chrono::{DateTime, Utc};
use condir_core::NormalizedContractor;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `contractors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContractorRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub reviews_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of [`upsert_contractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct UpsertedContractor {
    pub id: i64,
    /// `false` when an existing `(name, address)` row was updated.
    pub inserted: bool,
}

const CONTRACTOR_COLUMNS: &str = "c.id, c.public_id, c.name, c.rating, c.address, c.phone, \
     c.website, c.description, c.external_id, c.reviews_count, c.created_at, c.updated_at";

// ---------------------------------------------------------------------------
// contractors operations
// ---------------------------------------------------------------------------

/// Inserts or updates a contractor keyed by `(name, address)` and replaces
/// its certifications and services, all in one transaction.
///
/// On conflict, scraped attributes are overwritten; `external_id` and
/// `reviews_count` keep their stored value when the new record lacks one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in
/// that case.
pub async fn upsert_contractor(
    pool: &PgPool,
    contractor: &NormalizedContractor,
) -> Result<UpsertedContractor, DbError> {
    let mut tx = pool.begin().await?;

    // xmax = 0 only for a freshly inserted tuple.
    let upserted = sqlx::query_as::<_, UpsertedContractor>(
        "INSERT INTO contractors \
             (public_id, name, rating, address, phone, website, description, \
              external_id, reviews_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT ON CONSTRAINT contractors_name_address_key DO UPDATE SET \
             rating        = EXCLUDED.rating, \
             phone         = EXCLUDED.phone, \
             website       = EXCLUDED.website, \
             description   = EXCLUDED.description, \
             external_id   = COALESCE(EXCLUDED.external_id, contractors.external_id), \
             reviews_count = COALESCE(EXCLUDED.reviews_count, contractors.reviews_count), \
             updated_at    = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(Uuid::new_v4())
    .bind(&contractor.name)
    .bind(contractor.rating)
    .bind(contractor.address.as_deref())
    .bind(contractor.phone.as_deref())
    .bind(contractor.website.as_deref())
    .bind(contractor.description.as_deref())
    .bind(contractor.external_id.as_deref())
    .bind(contractor.reviews_count.and_then(|n| i32::try_from(n).ok()))
    .fetch_one(&mut *tx)
    .await?;

    replace_names(
        &mut tx,
        "certifications",
        "certification_name",
        upserted.id,
        &contractor.certifications,
    )
    .await?;
    replace_names(
        &mut tx,
        "services",
        "service_name",
        upserted.id,
        &contractor.services,
    )
    .await?;

    tx.commit().await?;
    Ok(upserted)
}

/// Delete every `table` row for `contractor_id` and insert `names` in order.
///
/// `table` and `column` are compile-time constants from this module, never
/// user input.
async fn replace_names(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    column: &'static str,
    contractor_id: i64,
    names: &[String],
) -> Result<(), DbError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE contractor_id = $1"))
        .bind(contractor_id)
        .execute(&mut **tx)
        .await?;

    let insert = format!("INSERT INTO {table} (contractor_id, {column}, position) VALUES ($1, $2, $3)");
    for (position, name) in names.iter().enumerate() {
        sqlx::query(&insert)
            .bind(contractor_id)
            .bind(name)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Returns every contractor, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contractors(pool: &PgPool) -> Result<Vec<ContractorRow>, DbError> {
    let rows = sqlx::query_as::<_, ContractorRow>(&format!(
        "SELECT {CONTRACTOR_COLUMNS} FROM contractors c ORDER BY c.name, c.id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns contractors that have no stored insight yet, oldest first.
///
/// `limit` of `None` returns all of them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contractors_without_insight(
    pool: &PgPool,
    limit: Option<i64>,
) -> Result<Vec<ContractorRow>, DbError> {
    let rows = sqlx::query_as::<_, ContractorRow>(&format!(
        "SELECT {CONTRACTOR_COLUMNS} FROM contractors c \
         WHERE NOT EXISTS (SELECT 1 FROM insights i WHERE i.contractor_id = c.id) \
         ORDER BY c.id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Certification names for one contractor, in scraped order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_contractor_certifications(
    pool: &PgPool,
    contractor_id: i64,
) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT certification_name FROM certifications \
         WHERE contractor_id = $1 ORDER BY position, id",
    )
    .bind(contractor_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}

/// Service names for one contractor, in scraped order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_contractor_services(
    pool: &PgPool,
    contractor_id: i64,
) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT service_name FROM services WHERE contractor_id = $1 ORDER BY position, id",
    )
    .bind(contractor_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_contractors(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contractors")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
