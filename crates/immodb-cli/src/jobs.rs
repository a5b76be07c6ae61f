//! Job inspection and bookkeeping commands.
//!
//! These are called from main after the database pool has been
//! established. They only read and delete job rows; execution lives in
//! the `scrape` module.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `jobs`.
#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// List recent jobs, newest first
    List {
        /// Filter by status (queued, running, completed, failed)
        #[arg(long)]
        status: Option<String>,
        /// Filter by portal identifier
        #[arg(long)]
        portal: Option<String>,
        /// Maximum number of jobs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show one job in full
    Show {
        /// Job id
        id: String,
    },
    /// Aggregate counters across all jobs
    Stats,
    /// Delete a job row
    Delete {
        /// Job id
        id: String,
    },
}

/// Prints a table of recent jobs.
///
/// # Errors
///
/// Returns an error when the job query fails.
pub(crate) async fn run_jobs_list(
    pool: &SqlitePool,
    status: Option<&str>,
    portal: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let jobs = immodb_db::list_jobs(pool, status, portal, limit).await?;

    if jobs.is_empty() {
        println!("no jobs found; run `immodb scrape run` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<16}{:<20}{:<11}{:<7}{:<7}CREATED",
        "ID", "PORTAL", "LOCATION", "STATUS", "FOUND", "SAVED"
    );
    for job in &jobs {
        let location = if job.location.chars().count() > 16 {
            format!("{}...", job.location.chars().take(16).collect::<String>())
        } else {
            job.location.clone()
        };
        println!(
            "{:<38}{:<16}{:<20}{:<11}{:<7}{:<7}{}",
            job.id,
            job.portal,
            location,
            job.status,
            job.listings_found,
            job.listings_saved,
            job.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

/// Prints one job with its filters, timings and recorded errors.
///
/// # Errors
///
/// Returns an error when the job does not exist or the query fails.
pub(crate) async fn run_jobs_show(pool: &SqlitePool, id: &str) -> anyhow::Result<()> {
    let job = match immodb_db::get_job(pool, id).await {
        Ok(job) => job,
        Err(immodb_db::DbError::NotFound) => {
            anyhow::bail!("job '{id}' not found; run `immodb jobs list` to see known ids")
        }
        Err(error) => return Err(error.into()),
    };

    println!("Job: {}", job.id);
    println!("Portal: {}  Location: {}", job.portal, job.location);
    println!("Status: {}", job.status);
    println!("Contract: {}", job.contract_type);
    if let Some(property_type) = &job.property_type {
        println!("Property type: {property_type}");
    }
    println!(
        "Price: {}  Rooms: {}  Sqm: {}",
        fmt_range(job.price_min, job.price_max),
        fmt_range(job.rooms_min, job.rooms_max),
        fmt_range(job.sqm_min, job.sqm_max),
    );
    println!("Profile: {}  Max pages: {}", job.profile_name, job.max_pages);
    println!(
        "Created: {} by {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S"),
        job.created_by
    );
    println!("Started: {}", fmt_stamp(job.started_at));
    let duration = job
        .duration_secs
        .map(|secs| format!(" ({secs:.1}s)"))
        .unwrap_or_default();
    println!("Completed: {}{duration}", fmt_stamp(job.completed_at));
    println!(
        "Listings: {} found, {} saved",
        job.listings_found, job.listings_saved
    );

    let errors: Vec<String> = serde_json::from_str(&job.errors).unwrap_or_default();
    if errors.is_empty() {
        println!("Errors: none");
    } else {
        println!("Errors:");
        for error in &errors {
            println!("  - {error}");
        }
    }
    Ok(())
}

/// Prints aggregate job counters and a per-portal breakdown.
///
/// # Errors
///
/// Returns an error when the aggregate query fails.
pub(crate) async fn run_jobs_stats(pool: &SqlitePool) -> anyhow::Result<()> {
    let stats = immodb_db::get_job_stats(pool).await?;

    println!(
        "Jobs: {} total, {} completed, {} failed",
        stats.total_jobs, stats.successful_jobs, stats.failed_jobs
    );
    println!(
        "Listings: {} scraped, {} saved",
        stats.total_listings_scraped, stats.total_properties_saved
    );
    if !stats.jobs_by_portal.is_empty() {
        println!();
        println!("{:<20}JOBS", "PORTAL");
        for (portal, count) in &stats.jobs_by_portal {
            println!("{portal:<20}{count}");
        }
    }
    Ok(())
}

/// Deletes a job row. An in-flight run for the job is not interrupted.
///
/// # Errors
///
/// Returns an error when the job does not exist or the delete fails.
pub(crate) async fn run_jobs_delete(pool: &SqlitePool, id: &str) -> anyhow::Result<()> {
    match immodb_db::delete_job(pool, id).await {
        Ok(()) => {
            println!("deleted job {id}");
            Ok(())
        }
        Err(immodb_db::DbError::NotFound) => {
            anyhow::bail!("job '{id}' not found; run `immodb jobs list` to see known ids")
        }
        Err(error) => Err(error.into()),
    }
}

fn fmt_stamp(stamp: Option<DateTime<Utc>>) -> String {
    stamp.map_or_else(
        || "\u{2014}".to_string(),
        |stamp| stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn fmt_range<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (None, None) => "any".to_string(),
        (Some(min), None) => format!("{min}.."),
        (None, Some(max)) => format!("..{max}"),
        (Some(min), Some(max)) => format!("{min}..{max}"),
    }
}
