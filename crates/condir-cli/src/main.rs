mod contractors;
mod enrich;
mod harvest;
mod load;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "condir-cli")]
#[command(about = "Contractor directory harvester and enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest listings from the contractor directory and store them
    Harvest {
        /// Postal code to search around (overrides `CONDIR_SITE_POSTAL_CODE`)
        #[arg(long)]
        postal_code: Option<String>,

        /// Country code for the search (overrides `CONDIR_SITE_COUNTRY_CODE`)
        #[arg(long)]
        country_code: Option<String>,

        /// Search radius in miles (overrides `CONDIR_SITE_DISTANCE`)
        #[arg(long)]
        distance: Option<u32>,

        /// Maximum pages to extract (overrides `CONDIR_HARVEST_MAX_PAGES`)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_pages: Option<u32>,

        /// Also write the accepted records as pretty JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Replay saved HTML pages from this directory instead of launching Chrome
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Harvest without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Load a JSON file of harvested records into the database
    Load {
        /// Path to a JSON array of listing records
        input: PathBuf,
    },
    /// Generate sales insights for contractors that do not have one yet
    Enrich {
        /// Stop after this many contractors
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Score stored insights and print the averages
    Evaluate {
        /// Write the per-insight scores as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List stored contractors with rating, certifications, and insight status
    Contractors {
        /// Also write the listing as pretty JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show recent harvest runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database is reachable
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = condir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("condir-cli ready; run with --help to list commands");
        return Ok(());
    };

    match command {
        Commands::Harvest {
            postal_code,
            country_code,
            distance,
            max_pages,
            output,
            snapshot_dir,
            dry_run,
        } => {
            let mut config = config;
            if let Some(postal_code) = postal_code {
                config.site_postal_code = postal_code;
            }
            if let Some(country_code) = country_code {
                config.site_country_code = country_code;
            }
            if let Some(distance) = distance {
                config.site_distance = distance;
            }
            if let Some(max_pages) = max_pages {
                config.harvest_max_pages = max_pages;
            }

            let options = harvest::HarvestOptions {
                output,
                snapshot_dir,
            };
            if dry_run {
                harvest::run_harvest_dry(&config, &options).await?;
            } else {
                let pool = connect(&config).await?;
                harvest::run_harvest(&pool, &config, &options).await?;
            }
        }
        Commands::Load { input } => {
            let pool = connect(&config).await?;
            load::run_load(&pool, &input).await?;
        }
        Commands::Enrich { limit } => {
            let pool = connect(&config).await?;
            enrich::run_enrich(&pool, &config, limit).await?;
        }
        Commands::Evaluate { report } => {
            let pool = connect(&config).await?;
            enrich::run_evaluate(&pool, report.as_deref()).await?;
        }
        Commands::Contractors { output } => {
            let pool = connect(&config).await?;
            contractors::run_contractors_list(&pool, output.as_deref()).await?;
        }
        Commands::Runs { limit } => {
            let pool = connect(&config).await?;
            harvest::run_runs_list(&pool, i64::from(limit)).await?;
        }
        Commands::Db { command } => {
            let pool = condir_db::connect_pool_from_app_config(&config).await?;
            match command {
                DbCommands::Migrate => {
                    let applied = condir_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
                DbCommands::Ping => {
                    condir_db::ping(&pool).await?;
                    println!("database reachable");
                }
            }
        }
    }

    Ok(())
}

/// Connect and bring the schema up to date before any data command.
async fn connect(config: &condir_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = condir_db::connect_pool_from_app_config(config).await?;
    condir_db::run_migrations(&pool).await?;
    Ok(pool)
}

/// Attempt to mark a harvest run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = condir_db::fail_harvest_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark harvest run as failed"
        );
    }
}
