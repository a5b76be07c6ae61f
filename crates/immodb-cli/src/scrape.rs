//! Scrape job submission and execution.
//!
//! `scrape run` validates the request, persists it as a queued job, then
//! executes it in-process: the job transitions to running, the portal's
//! pagination loop is driven through a browser-backed fetcher, parsed
//! listings are ingested, and the job closes with its counters. Failures
//! land on the job row before the command exits, so `jobs show` can
//! always explain what happened.

use std::time::Instant;

use clap::Subcommand;
use sqlx::SqlitePool;

use immodb_core::{AppConfig, JobRequest};
use immodb_scraper::{
    known_portals, scraper_for, BrowserFetcher, PageFetcher, PortalScraper, ScrapeLimits,
};

/// Sub-commands available under `scrape`.
#[derive(Debug, Subcommand)]
pub enum ScrapeCommands {
    /// Submit a scraping job and execute it immediately
    Run {
        /// Portal identifier (see `immodb_scraper::known_portals`)
        #[arg(long)]
        portal: String,
        /// Location to search, e.g. "Milano"
        #[arg(long)]
        location: String,
        /// Contract type: vendita or affitto
        #[arg(long, default_value = "vendita")]
        contract: String,
        /// Property type hint passed to the portal, e.g. "appartamento"
        #[arg(long)]
        property_type: Option<String>,
        /// Minimum price in euros
        #[arg(long)]
        price_min: Option<f64>,
        /// Maximum price in euros
        #[arg(long)]
        price_max: Option<f64>,
        /// Minimum number of rooms
        #[arg(long)]
        rooms_min: Option<u32>,
        /// Maximum number of rooms
        #[arg(long)]
        rooms_max: Option<u32>,
        /// Minimum surface in square meters
        #[arg(long)]
        sqm_min: Option<f64>,
        /// Maximum surface in square meters
        #[arg(long)]
        sqm_max: Option<f64>,
        /// Result pages to fetch (1-10)
        #[arg(long, default_value = "3")]
        max_pages: u32,
        /// Browser profile to run under; defaults to "{portal}_{location}"
        #[arg(long)]
        profile: Option<String>,
        /// Bypass the page cache for this run
        #[arg(long)]
        no_cache: bool,
    },
}

/// Summary of one executed job, mirroring what lands on the job row.
#[derive(Debug)]
pub(crate) struct RunSummary {
    pub status: &'static str,
    pub listings_found: usize,
    pub saved: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub duration_secs: f64,
}

/// Submits a job for the requested search and executes it.
///
/// # Errors
///
/// Returns an error when the request is invalid, the portal is unknown,
/// the browser cannot be started, or the run itself fails. Failures
/// after the job row exists are recorded on it before returning.
pub(crate) async fn run_scrape_run(
    pool: &SqlitePool,
    config: &AppConfig,
    request: &JobRequest,
    use_cache: bool,
) -> anyhow::Result<()> {
    request.validate()?;
    let scraper = scraper_for(&request.portal).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown portal '{}'; known portals: {}",
            request.portal,
            known_portals().join(", ")
        )
    })?;

    let job = immodb_db::create_job(pool, request, "cli").await?;
    println!("created job {}", job.id);

    let fetcher = match BrowserFetcher::connect(
        pool.clone(),
        config,
        &job.portal,
        &job.profile_name,
        scraper.requests_per_second().unwrap_or(config.rate_limit_rps),
        use_cache,
    )
    .await
    {
        Ok(fetcher) => fetcher,
        Err(error) => {
            let message = format!("browser startup failed: {error}");
            // Walk the job to a terminal status so the failure is on record.
            match immodb_db::start_job(pool, &job.id).await {
                Ok(()) => {
                    fail_job_best_effort(pool, &job.id, &[message.clone()], 0.0).await;
                }
                Err(db_error) => {
                    tracing::error!(job_id = %job.id, error = %db_error, "could not mark job running");
                }
            }
            anyhow::bail!("{message}");
        }
    };

    let limits = ScrapeLimits::from_app_config(config);
    let result = execute_job(pool, &job, scraper.as_ref(), &fetcher, &limits).await;
    fetcher.close().await;

    let summary = result?;
    print_summary(&job, &summary);
    Ok(())
}

/// Runs one queued job to a terminal status.
///
/// Transitions the job to running, drives the portal's pagination loop
/// through `fetcher`, ingests the parsed listings, and closes the job as
/// completed with its counters. A run where every fetched page failed
/// closes the job as failed instead.
///
/// # Errors
///
/// Returns an error when the job could not reach completion; where
/// possible the failure is recorded on the job row first.
pub(crate) async fn execute_job(
    pool: &SqlitePool,
    job: &immodb_db::JobRow,
    scraper: &dyn PortalScraper,
    fetcher: &dyn PageFetcher,
    limits: &ScrapeLimits,
) -> anyhow::Result<RunSummary> {
    immodb_db::start_job(pool, &job.id).await?;
    let started = Instant::now();
    tracing::info!(
        job_id = %job.id,
        portal = %job.portal,
        location = %job.location,
        "job started"
    );

    let filters = job_filters(job);
    let max_pages = u32::try_from(job.max_pages).unwrap_or(1);
    let outcome = scraper.scrape_search(fetcher, &filters, max_pages, limits).await;

    if outcome.listings.is_empty() && !outcome.errors.is_empty() {
        let duration = started.elapsed().as_secs_f64();
        let failed_pages = outcome.errors.len();
        fail_job_best_effort(pool, &job.id, &outcome.errors, duration).await;
        anyhow::bail!("all {failed_pages} fetched pages failed");
    }

    let batch = immodb_db::save_properties_batch(pool, &outcome.listings).await;

    let mut errors = outcome.errors;
    errors.extend(batch.errors);

    let duration = started.elapsed().as_secs_f64();
    let listings_found = outcome.listings.len();

    if let Err(db_error) = immodb_db::complete_job(
        pool,
        &job.id,
        i64::try_from(listings_found).unwrap_or(i64::MAX),
        i64::try_from(batch.saved).unwrap_or(i64::MAX),
        &errors,
        duration,
    )
    .await
    {
        fail_job_best_effort(pool, &job.id, &errors, duration).await;
        anyhow::bail!("could not close job: {db_error}");
    }

    tracing::info!(
        job_id = %job.id,
        listings_found,
        saved = batch.saved,
        skipped = batch.skipped,
        "job completed"
    );

    Ok(RunSummary {
        status: immodb_db::STATUS_COMPLETED,
        listings_found,
        saved: batch.saved,
        skipped: batch.skipped,
        errors,
        duration_secs: duration,
    })
}

fn job_filters(job: &immodb_db::JobRow) -> immodb_core::SearchFilters {
    immodb_core::SearchFilters {
        location: job.location.clone(),
        contract_type: job.contract_type.clone(),
        property_type: job.property_type.clone(),
        price_min: job.price_min,
        price_max: job.price_max,
        rooms_min: job.rooms_min.and_then(|rooms| u32::try_from(rooms).ok()),
        rooms_max: job.rooms_max.and_then(|rooms| u32::try_from(rooms).ok()),
        sqm_min: job.sqm_min,
        sqm_max: job.sqm_max,
    }
}

fn print_summary(job: &immodb_db::JobRow, summary: &RunSummary) {
    println!(
        "job {} {}: portal {}, location {}",
        job.id, summary.status, job.portal, job.location
    );
    println!(
        "  {} listings found, {} saved, {} skipped in {:.1}s",
        summary.listings_found, summary.saved, summary.skipped, summary.duration_secs
    );
    if !summary.errors.is_empty() {
        println!("  {} soft errors:", summary.errors.len());
        for error in &summary.errors {
            println!("    {error}");
        }
    }
}

/// Attempts to mark a job as failed, logging any secondary error.
pub(crate) async fn fail_job_best_effort(
    pool: &SqlitePool,
    job_id: &str,
    errors: &[String],
    duration_secs: f64,
) {
    if let Err(mark_err) = immodb_db::fail_job(pool, job_id, errors, duration_secs).await {
        tracing::error!(
            job_id,
            error = %mark_err,
            "failed to mark job as failed"
        );
    }
}

#[cfg(test)]
#[path = "scrape_test.rs"]
mod tests;
