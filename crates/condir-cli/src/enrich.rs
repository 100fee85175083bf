//! `enrich` and `evaluate` command handlers.
//!
//! Per-contractor generation failures are logged and skipped so one bad
//! response does not abort the batch.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use condir_core::AppConfig;
use condir_insights::{
    evaluate_insight, ContractorContext, EvaluatedInsight, InsightsClient, ScoreAverages,
};
use serde::Serialize;

/// Build the generator's view of a stored contractor.
async fn load_context(
    pool: &sqlx::PgPool,
    contractor: &condir_db::ContractorRow,
) -> anyhow::Result<ContractorContext> {
    let certifications = condir_db::get_contractor_certifications(pool, contractor.id).await?;
    let services = condir_db::get_contractor_services(pool, contractor.id).await?;
    Ok(ContractorContext {
        name: contractor.name.clone(),
        rating: contractor.rating,
        address: contractor.address.clone(),
        phone: contractor.phone.clone(),
        website: contractor.website.clone(),
        description: contractor.description.clone(),
        certifications,
        services,
        reviews_count: contractor.reviews_count,
    })
}

/// Generate and store one insight for each contractor that has none.
///
/// # Errors
///
/// Returns an error if the insights endpoint is not configured or a database
/// query fails. Generation failures are logged and skipped.
pub(crate) async fn run_enrich(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let client = InsightsClient::from_app_config(config)?;
    let pending =
        condir_db::list_contractors_without_insight(pool, limit.map(i64::from)).await?;

    if pending.is_empty() {
        println!("every stored contractor already has an insight");
        return Ok(());
    }

    let delay = Duration::from_millis(config.insights_delay_ms);
    let total = pending.len();
    let mut generated = 0_usize;
    let mut failed = 0_usize;

    for (i, contractor) in pending.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let context = load_context(pool, contractor).await?;
        match client.generate(&context).await {
            Ok(text) => {
                condir_db::insert_insight(pool, contractor.id, &text, client.model()).await?;
                generated += 1;
                tracing::info!(
                    contractor_id = contractor.id,
                    name = %contractor.name,
                    progress = %format!("{}/{total}", i + 1),
                    "insight stored"
                );
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    contractor_id = contractor.id,
                    name = %contractor.name,
                    error = %e,
                    "insight generation failed; skipping contractor"
                );
            }
        }
    }

    println!("generated {generated} insights ({failed} failed) for {total} contractors");
    Ok(())
}

#[derive(Debug, Serialize)]
struct EvaluationReport<'a> {
    averages: ScoreAverages,
    insights: &'a [EvaluatedInsight],
}

/// Score every stored insight, print the averages, and optionally write a
/// JSON report.
///
/// # Errors
///
/// Returns an error if the query fails or the report cannot be written.
pub(crate) async fn run_evaluate(pool: &sqlx::PgPool, report: Option<&Path>) -> anyhow::Result<()> {
    let rows = condir_db::list_insights(pool).await?;
    if rows.is_empty() {
        println!("no insights found; run `enrich` first");
        return Ok(());
    }

    let evaluated: Vec<EvaluatedInsight> = rows
        .into_iter()
        .map(|row| EvaluatedInsight {
            scores: evaluate_insight(&row.insight_text, &row.contractor_name, row.rating),
            contractor_name: row.contractor_name,
            insight: row.insight_text,
        })
        .collect();
    let averages = ScoreAverages::from_scores(evaluated.iter().map(|e| &e.scores));

    println!("insight evaluation over {} insights", evaluated.len());
    println!("{}", "=".repeat(40));
    for (label, value) in averages.rows() {
        println!("{label:<20}: {value:.2}/10");
    }

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&EvaluationReport {
            averages,
            insights: &evaluated,
        })?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("report saved to {}", path.display());
    }
    Ok(())
}
