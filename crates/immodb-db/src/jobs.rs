//! Database operations for the `scraping_jobs` table.
//!
//! A job moves `queued -> running -> {completed|failed}` and never leaves a
//! terminal status. Transitions are guarded updates: the `WHERE` clause pins
//! the expected current status, and zero affected rows means the transition
//! was illegal for this job.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use immodb_core::JobRequest;

use crate::DbError;

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scraping_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: String,
    pub portal: String,
    pub location: String,
    pub contract_type: String,
    pub property_type: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rooms_min: Option<i64>,
    pub rooms_max: Option<i64>,
    pub sqm_min: Option<f64>,
    pub sqm_max: Option<f64>,
    pub max_pages: i64,
    pub profile_name: String,
    pub status: String,
    pub listings_found: i64,
    pub listings_saved: i64,
    /// JSON array of error strings accumulated during the run.
    pub errors: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Added in the job-audit migration.
    pub duration_secs: Option<f64>,
    /// Added in the job-audit migration.
    pub created_by: String,
}

/// Aggregate counters over the whole `scraping_jobs` table.
#[derive(Debug, Clone)]
pub struct JobStats {
    pub total_jobs: i64,
    pub successful_jobs: i64,
    pub failed_jobs: i64,
    pub total_listings_scraped: i64,
    pub total_properties_saved: i64,
    /// `(portal, job count)` pairs, most jobs first.
    pub jobs_by_portal: Vec<(String, i64)>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a new job in `queued` status from a validated request.
///
/// Generates a UUID in Rust and binds it as the row id. The profile name is
/// resolved through [`JobRequest::effective_profile`]. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_job(
    pool: &SqlitePool,
    request: &JobRequest,
    created_by: &str,
) -> Result<JobRow, DbError> {
    let id = Uuid::new_v4().to_string();

    let row = sqlx::query_as::<_, JobRow>(
        "INSERT INTO scraping_jobs \
             (id, portal, location, contract_type, property_type, price_min, \
              price_max, rooms_min, rooms_max, sqm_min, sqm_max, max_pages, \
              profile_name, status, listings_found, listings_saved, errors, \
              created_at, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
                 'queued', 0, 0, '[]', ?14, ?15) \
         RETURNING id, portal, location, contract_type, property_type, price_min, \
                   price_max, rooms_min, rooms_max, sqm_min, sqm_max, max_pages, \
                   profile_name, status, listings_found, listings_saved, errors, \
                   created_at, started_at, completed_at, duration_secs, created_by",
    )
    .bind(id)
    .bind(&request.portal)
    .bind(&request.location)
    .bind(&request.contract_type)
    .bind(&request.property_type)
    .bind(request.price_min)
    .bind(request.price_max)
    .bind(request.rooms_min.map(i64::from))
    .bind(request.rooms_max.map(i64::from))
    .bind(request.sqm_min)
    .bind(request.sqm_max)
    .bind(i64::from(request.max_pages))
    .bind(request.effective_profile())
    .bind(Utc::now())
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a job as `running` and sets `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_job(pool: &SqlitePool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scraping_jobs \
         SET status = 'running', started_at = ?1 \
         WHERE id = ?2 AND status = 'queued'",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id: id.to_string(),
            expected_status: STATUS_QUEUED,
        });
    }

    Ok(())
}

/// Marks a job as `completed` with its final counters.
///
/// Per-page soft failures collected during the run land in `errors` even on
/// the success path.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(
    pool: &SqlitePool,
    id: &str,
    listings_found: i64,
    listings_saved: i64,
    errors: &[String],
    duration_secs: f64,
) -> Result<(), DbError> {
    let errors_json = serde_json::to_string(errors)?;

    let result = sqlx::query(
        "UPDATE scraping_jobs \
         SET status = 'completed', completed_at = ?1, listings_found = ?2, \
             listings_saved = ?3, errors = ?4, duration_secs = ?5 \
         WHERE id = ?6 AND status = 'running'",
    )
    .bind(Utc::now())
    .bind(listings_found)
    .bind(listings_saved)
    .bind(errors_json)
    .bind(duration_secs)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id: id.to_string(),
            expected_status: STATUS_RUNNING,
        });
    }

    Ok(())
}

/// Marks a job as `failed` with the collected errors and elapsed duration.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(
    pool: &SqlitePool,
    id: &str,
    errors: &[String],
    duration_secs: f64,
) -> Result<(), DbError> {
    let errors_json = serde_json::to_string(errors)?;

    let result = sqlx::query(
        "UPDATE scraping_jobs \
         SET status = 'failed', completed_at = ?1, errors = ?2, duration_secs = ?3 \
         WHERE id = ?4 AND status = 'running'",
    )
    .bind(Utc::now())
    .bind(errors_json)
    .bind(duration_secs)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id: id.to_string(),
            expected_status: STATUS_RUNNING,
        });
    }

    Ok(())
}

/// Fetches a single job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job(pool: &SqlitePool, id: &str) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, portal, location, contract_type, property_type, price_min, \
                price_max, rooms_min, rooms_max, sqm_min, sqm_max, max_pages, \
                profile_name, status, listings_found, listings_saved, errors, \
                created_at, started_at, completed_at, duration_secs, created_by \
         FROM scraping_jobs \
         WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, newest first, optionally filtered
/// by status and/or portal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(
    pool: &SqlitePool,
    status: Option<&str>,
    portal: Option<&str>,
    limit: i64,
) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(
        "SELECT id, portal, location, contract_type, property_type, price_min, \
                price_max, rooms_min, rooms_max, sqm_min, sqm_max, max_pages, \
                profile_name, status, listings_found, listings_saved, errors, \
                created_at, started_at, completed_at, duration_secs, created_by \
         FROM scraping_jobs \
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR portal = ?2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT ?3",
    )
    .bind(status)
    .bind(portal)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes a job row.
///
/// Removal is bookkeeping only; an in-flight run for this job is not
/// interrupted.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_job(pool: &SqlitePool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM scraping_jobs WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Computes aggregate job statistics by scanning the whole table.
///
/// Fine at this system's job volume; would need incremental counters if jobs
/// ever number in the millions.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_job_stats(pool: &SqlitePool) -> Result<JobStats, DbError> {
    let (total_jobs, successful_jobs, failed_jobs, total_listings_scraped, total_properties_saved) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            "SELECT COUNT(*), \
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0), \
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0), \
                    COALESCE(SUM(listings_found), 0), \
                    COALESCE(SUM(listings_saved), 0) \
             FROM scraping_jobs",
        )
        .fetch_one(pool)
        .await?;

    let jobs_by_portal = sqlx::query_as::<_, (String, i64)>(
        "SELECT portal, COUNT(*) \
         FROM scraping_jobs \
         GROUP BY portal \
         ORDER BY COUNT(*) DESC, portal ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(JobStats {
        total_jobs,
        successful_jobs,
        failed_jobs,
        total_listings_scraped,
        total_properties_saved,
        jobs_by_portal,
    })
}
