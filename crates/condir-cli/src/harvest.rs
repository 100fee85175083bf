//! `harvest` and `runs` command handlers.
//!
//! The harvester drives a blocking browser session, so it runs on the
//! blocking pool while a Ctrl-C listener flips its stop flag.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use condir_core::AppConfig;
use condir_scraper::{
    ChromeOptions, ChromeSession, CompiledProfile, HarvestConfig, HarvestOutcome, Harvester,
    SnapshotSession, StopReason,
};

use crate::fail_run_best_effort;
use crate::load::store_records;

#[derive(Debug, Clone, Default)]
pub(crate) struct HarvestOptions {
    pub output: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
}

/// Where the pages come from.
#[derive(Debug, Clone)]
enum PageSource {
    Chrome(ChromeOptions),
    Snapshots(PathBuf),
}

impl PageSource {
    fn from_options(config: &AppConfig, options: &HarvestOptions) -> Self {
        match &options.snapshot_dir {
            Some(dir) => Self::Snapshots(dir.clone()),
            None => Self::Chrome(ChromeOptions {
                path: config.chrome_path.clone(),
                headless: config.chrome_headless,
            }),
        }
    }
}

/// Resolve the site profile and harvest settings from config.
fn build_harvester(config: &AppConfig) -> anyhow::Result<Harvester> {
    let profile = match &config.site_profile_path {
        Some(path) => condir_core::load_site_profile(path)?,
        None => condir_core::SiteProfile::default(),
    };
    let profile = CompiledProfile::compile(&profile)?;
    let harvest_config = HarvestConfig::from_app_config(config)?;
    Ok(Harvester::new(harvest_config, profile))
}

/// Run the harvester to completion on the blocking pool.
///
/// Ctrl-C sets the stop flag; the current page is kept and the harvest ends
/// before the next one.
async fn harvest(harvester: Harvester, source: PageSource) -> anyhow::Result<HarvestOutcome> {
    let stop = Arc::new(AtomicBool::new(false));
    let harvester = harvester.with_stop_flag(Arc::clone(&stop));

    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing the current page");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<HarvestOutcome> {
        match source {
            PageSource::Snapshots(dir) => {
                let mut session = SnapshotSession::from_dir(&dir)?;
                Ok(harvester.run(&mut session))
            }
            PageSource::Chrome(options) => {
                let mut session = ChromeSession::launch(&options)?;
                Ok(harvester.run(&mut session))
            }
        }
    })
    .await
    .context("harvest task panicked");

    listener.abort();
    result?
}

fn write_output(path: &Path, outcome: &HarvestOutcome) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&outcome.records)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {} records to {}", outcome.records.len(), path.display());
    Ok(())
}

fn print_outcome(outcome: &HarvestOutcome) {
    println!(
        "harvested {} records from {} pages (stopped: {}, {} unnamed listings skipped)",
        outcome.records.len(),
        outcome.pages_visited,
        outcome.stop_reason,
        outcome.skipped_elements,
    );
}

/// Harvest and print the results without touching the database.
///
/// # Errors
///
/// Returns an error if the profile or URL is invalid, the page source cannot
/// be opened, or the output file cannot be written.
pub(crate) async fn run_harvest_dry(
    config: &AppConfig,
    options: &HarvestOptions,
) -> anyhow::Result<()> {
    let harvester = build_harvester(config)?;
    let outcome = harvest(harvester, PageSource::from_options(config, options)).await?;

    print_outcome(&outcome);
    for record in &outcome.records {
        println!(
            "  {:<40} {:<6} {}",
            record.name.as_deref().unwrap_or_default(),
            record.rating.as_deref().unwrap_or("\u{2014}"),
            record.address.as_deref().unwrap_or("\u{2014}"),
        );
    }
    if let Some(path) = &options.output {
        write_output(path, &outcome)?;
    }
    println!("[dry-run] no records written to the database");
    Ok(())
}

/// Harvest, store the accepted records, and track the run in `harvest_runs`.
///
/// A session fault still stores the partial results before the run is
/// marked failed.
///
/// # Errors
///
/// Returns an error if the run cannot be created or started, the page source
/// cannot be opened, or storing records fails.
pub(crate) async fn run_harvest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    options: &HarvestOptions,
) -> anyhow::Result<()> {
    let harvester = build_harvester(config)?;
    let source_url = config.search_url()?.to_string();

    let run = condir_db::create_harvest_run(pool, &source_url).await?;
    if let Err(e) = condir_db::start_harvest_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, url = %source_url, "harvest run started");

    let outcome = match harvest(harvester, PageSource::from_options(config, options)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
            return Err(err);
        }
    };
    print_outcome(&outcome);

    if let Some(path) = &options.output {
        if let Err(err) = write_output(path, &outcome) {
            tracing::warn!(error = %err, "failed to write harvest output file");
        }
    }

    let totals = match store_records(pool, &outcome.records).await {
        Ok(totals) => totals,
        Err(err) => {
            fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
            return Err(err);
        }
    };
    println!(
        "stored {} contractors ({} new, {} updated)",
        totals.stored(),
        totals.inserted,
        totals.updated
    );

    if let StopReason::Fault(message) = &outcome.stop_reason {
        fail_run_best_effort(pool, run.id, message.clone()).await;
        anyhow::bail!(
            "harvest aborted after {} pages: {message}",
            outcome.pages_visited
        );
    }

    let pages = i32::try_from(outcome.pages_visited).unwrap_or(i32::MAX);
    let records = i32::try_from(totals.stored()).unwrap_or(i32::MAX);
    if let Err(err) =
        condir_db::complete_harvest_run(pool, run.id, pages, records, outcome.stop_reason.as_str())
            .await
    {
        fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }
    Ok(())
}

/// Print the most recent harvest runs.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_runs_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = condir_db::list_harvest_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no harvest runs recorded; run `harvest` first");
        return Ok(());
    }

    println!(
        "{:<6}{:<11}{:<22}{:>7}{:>9}  STOP",
        "ID", "STATUS", "STARTED", "PAGES", "RECORDS"
    );
    for run in &runs {
        let started = run.started_at.map_or_else(
            || "\u{2014}".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let stop = run
            .stop_reason
            .as_deref()
            .or(run.error_message.as_deref())
            .unwrap_or("\u{2014}");
        println!(
            "{:<6}{:<11}{:<22}{:>7}{:>9}  {stop}",
            run.id, run.status, started, run.pages_visited, run.records_harvested
        );
    }
    Ok(())
}
