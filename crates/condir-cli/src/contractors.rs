//! `contractors` command handler: the stored leads with rating,
//! certifications, and insight presence.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// One stored contractor as shown by `contractors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ContractorSummary {
    pub id: i64,
    pub name: String,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub certifications: Vec<String>,
    pub has_insight: bool,
}

/// Highest rated first, unrated last, ties by name.
pub(crate) fn sort_by_rating(summaries: &mut [ContractorSummary]) {
    summaries.sort_by(|a, b| {
        let rating = match (a.rating, b.rating) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        rating.then_with(|| a.name.cmp(&b.name))
    });
}

fn rating_label(rating: Option<f64>) -> String {
    rating.map_or_else(|| "\u{2014}".to_string(), |r| format!("{r:.1}"))
}

/// Print every stored contractor and optionally write them as JSON.
///
/// # Errors
///
/// Returns an error if a database query fails or the output file cannot be
/// written.
pub(crate) async fn run_contractors_list(
    pool: &sqlx::PgPool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let rows = condir_db::list_contractors(pool).await?;
    if rows.is_empty() {
        println!("no contractors stored; run `harvest` or `load` first");
        return Ok(());
    }

    let with_insight: HashSet<i64> = condir_db::list_insights(pool)
        .await?
        .into_iter()
        .map(|insight| insight.contractor_id)
        .collect();

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let certifications = condir_db::get_contractor_certifications(pool, row.id).await?;
        summaries.push(ContractorSummary {
            id: row.id,
            has_insight: with_insight.contains(&row.id),
            name: row.name,
            rating: row.rating,
            address: row.address,
            phone: row.phone,
            website: row.website,
            certifications,
        });
    }
    sort_by_rating(&mut summaries);

    println!("{:<6}{:<40}{:>7}{:>9}  CERTIFICATIONS", "ID", "NAME", "RATING", "INSIGHT");
    for summary in &summaries {
        let certifications = if summary.certifications.is_empty() {
            "\u{2014}".to_string()
        } else {
            summary.certifications.join(", ")
        };
        println!(
            "{:<6}{:<40}{:>7}{:>9}  {certifications}",
            summary.id,
            summary.name,
            rating_label(summary.rating),
            if summary.has_insight { "yes" } else { "no" },
        );
    }
    let insights = summaries.iter().filter(|s| s.has_insight).count();
    println!("{} contractors, {insights} with insights", summaries.len());

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&summaries)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} contractors to {}", summaries.len(), path.display());
    }
    Ok(())
}
