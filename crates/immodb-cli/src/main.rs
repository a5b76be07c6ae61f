//! Command line interface for the immodb scraping engine.
//!
//! Subcommands are grouped by domain: `db` for connectivity and
//! migrations, `scrape` for submitting and executing jobs, `jobs`,
//! `sessions` and `properties` for inspecting state, and `cache` for
//! page-cache maintenance. Command handlers live in the sibling
//! modules; `main` only parses arguments, wires up configuration and
//! the database pool, and dispatches.

use clap::{Parser, Subcommand};

mod cache;
mod db;
mod jobs;
mod properties;
mod scrape;
mod sessions;

#[derive(Debug, Parser)]
#[command(name = "immodb")]
#[command(about = "Real-estate portal scraping engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity and migrations
    Db {
        #[command(subcommand)]
        command: db::DbCommands,
    },
    /// Submit and execute scraping jobs
    Scrape {
        #[command(subcommand)]
        command: scrape::ScrapeCommands,
    },
    /// Inspect and manage scraping jobs
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommands,
    },
    /// Inspect and invalidate stored browser sessions
    Sessions {
        #[command(subcommand)]
        command: sessions::SessionsCommands,
    },
    /// Page-cache maintenance
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
    /// Query ingested properties
    Properties {
        #[command(subcommand)]
        command: properties::PropertiesCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("no command given; try `immodb --help`");
        return Ok(());
    };

    let config = immodb_core::load_app_config_from_env()?;
    init_tracing(&config.log_level);

    let pool = immodb_db::connect_pool(
        &config.database_url,
        immodb_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Db { command } => match command {
            db::DbCommands::Ping => db::run_db_ping(&pool).await,
            db::DbCommands::Migrate => db::run_db_migrate(&pool).await,
        },
        Commands::Scrape { command } => match command {
            scrape::ScrapeCommands::Run {
                portal,
                location,
                contract,
                property_type,
                price_min,
                price_max,
                rooms_min,
                rooms_max,
                sqm_min,
                sqm_max,
                max_pages,
                profile,
                no_cache,
            } => {
                let request = immodb_core::JobRequest {
                    portal,
                    location,
                    contract_type: contract,
                    property_type,
                    price_min,
                    price_max,
                    rooms_min,
                    rooms_max,
                    sqm_min,
                    sqm_max,
                    max_pages,
                    profile_name: profile,
                };
                scrape::run_scrape_run(&pool, &config, &request, !no_cache).await
            }
        },
        Commands::Jobs { command } => match command {
            jobs::JobsCommands::List {
                status,
                portal,
                limit,
            } => jobs::run_jobs_list(&pool, status.as_deref(), portal.as_deref(), limit).await,
            jobs::JobsCommands::Show { id } => jobs::run_jobs_show(&pool, &id).await,
            jobs::JobsCommands::Stats => jobs::run_jobs_stats(&pool).await,
            jobs::JobsCommands::Delete { id } => jobs::run_jobs_delete(&pool, &id).await,
        },
        Commands::Sessions { command } => match command {
            sessions::SessionsCommands::List => sessions::run_sessions_list(&pool).await,
            sessions::SessionsCommands::Invalidate { profile, portal } => {
                sessions::run_sessions_invalidate(&pool, &profile, &portal).await
            }
        },
        Commands::Cache { command } => match command {
            cache::CacheCommands::Clear { portal } => cache::run_cache_clear(&config, &portal),
            cache::CacheCommands::ClearExpired { portal } => {
                cache::run_cache_clear_expired(&config, portal.as_deref())
            }
        },
        Commands::Properties { command } => match command {
            properties::PropertiesCommands::List {
                source,
                city,
                limit,
                offset,
            } => {
                properties::run_properties_list(
                    &pool,
                    source.as_deref(),
                    city.as_deref(),
                    limit,
                    offset,
                )
                .await
            }
        },
    }
}

/// `RUST_LOG` wins when set; otherwise the configured level applies.
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
