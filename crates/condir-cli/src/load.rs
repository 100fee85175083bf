//! ETL step: normalize harvested listings and upsert them.

use std::path::Path;

use anyhow::Context;
use condir_core::ListingRecord;

/// Counts from one [`store_records`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoreTotals {
    pub inserted: usize,
    pub updated: usize,
    /// Records without a usable name.
    pub skipped: usize,
}

impl StoreTotals {
    pub(crate) fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Normalize every record and upsert it by `(name, address)`.
///
/// # Errors
///
/// Returns an error on the first failed upsert; earlier rows stay committed.
pub(crate) async fn store_records(
    pool: &sqlx::PgPool,
    records: &[ListingRecord],
) -> anyhow::Result<StoreTotals> {
    let mut totals = StoreTotals::default();

    for record in records {
        let Some(contractor) = condir_scraper::normalize_listing(record.clone()) else {
            tracing::warn!(?record, "skipping record without a name");
            totals.skipped += 1;
            continue;
        };

        let upserted = condir_db::upsert_contractor(pool, &contractor)
            .await
            .with_context(|| format!("failed to store contractor '{}'", contractor.name))?;
        if upserted.inserted {
            totals.inserted += 1;
        } else {
            totals.updated += 1;
        }
    }

    Ok(totals)
}

/// Parse a JSON array of listing records.
///
/// # Errors
///
/// Returns an error if `text` is not a JSON array of records.
pub(crate) fn parse_records(text: &str) -> anyhow::Result<Vec<ListingRecord>> {
    serde_json::from_str(text).context("expected a JSON array of listing records")
}

/// Load a previously written harvest file into the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an upsert fails.
pub(crate) async fn run_load(pool: &sqlx::PgPool, input: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let records = parse_records(&text)?;

    let totals = store_records(pool, &records).await?;
    let total = condir_db::count_contractors(pool).await?;
    println!(
        "loaded {} records from {}: {} new, {} updated, {} skipped ({total} contractors stored)",
        records.len(),
        input.display(),
        totals.inserted,
        totals.updated,
        totals.skipped,
    );
    Ok(())
}
