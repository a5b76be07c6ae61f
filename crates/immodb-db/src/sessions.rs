//! Database operations for the `scraping_sessions` table.
//!
//! One valid row exists per `(profile_name, portal)` pair. Saving reuses the
//! row and bumps `success_count`; a failed authentication check flips
//! `is_valid` off and bumps `failure_count`. Rows are never deleted, so the
//! full history of an identity stays inspectable.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scraping_sessions` table.
///
/// `cookies` is a JSON array; `local_storage` and `session_storage` are JSON
/// objects. All three are stored as TEXT and parsed by the browser layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub profile_name: String,
    pub portal: String,
    pub cookies: String,
    pub local_storage: String,
    pub session_storage: String,
    pub user_agent: Option<String>,
    pub viewport_width: i64,
    pub viewport_height: i64,
    pub is_authenticated: bool,
    pub is_valid: bool,
    pub use_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Captured browser state to persist for a `(profile, portal)` pair.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub profile_name: String,
    pub portal: String,
    pub cookies: String,
    pub local_storage: String,
    pub session_storage: String,
    pub user_agent: Option<String>,
    pub viewport_width: i64,
    pub viewport_height: i64,
    pub is_authenticated: bool,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Loads the valid session for a `(profile, portal)` pair, if one exists.
///
/// Returns `None` when no row exists, the row is marked invalid, or the row
/// has passed its `expires_at`. An expired row is flipped to invalid as a
/// side effect so later loads skip the expiry check. On a hit, `use_count`
/// is incremented and `last_used_at` set before the row is returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn load_session(
    pool: &SqlitePool,
    profile_name: &str,
    portal: &str,
) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT id, profile_name, portal, cookies, local_storage, session_storage, \
                user_agent, viewport_width, viewport_height, is_authenticated, \
                is_valid, use_count, success_count, failure_count, created_at, \
                last_used_at, expires_at \
         FROM scraping_sessions \
         WHERE profile_name = ?1 AND portal = ?2 AND is_valid = 1",
    )
    .bind(profile_name)
    .bind(portal)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    if let Some(expires_at) = row.expires_at {
        if expires_at < Utc::now() {
            sqlx::query("UPDATE scraping_sessions SET is_valid = 0 WHERE id = ?1")
                .bind(&row.id)
                .execute(pool)
                .await?;
            return Ok(None);
        }
    }

    let row = sqlx::query_as::<_, SessionRow>(
        "UPDATE scraping_sessions \
         SET use_count = use_count + 1, last_used_at = ?1 \
         WHERE id = ?2 \
         RETURNING id, profile_name, portal, cookies, local_storage, session_storage, \
                   user_agent, viewport_width, viewport_height, is_authenticated, \
                   is_valid, use_count, success_count, failure_count, created_at, \
                   last_used_at, expires_at",
    )
    .bind(Utc::now())
    .bind(&row.id)
    .fetch_one(pool)
    .await?;

    Ok(Some(row))
}

/// Inserts or refreshes the session row for a `(profile, portal)` pair.
///
/// A fresh row starts with `use_count = 1` and `success_count = 1`. An
/// existing row keeps its counters, gains one success, and is marked valid
/// again; the stored browser state is replaced wholesale. `expires_at` is
/// pushed out by `expires_in_days` from now in both cases.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_session(
    pool: &SqlitePool,
    session: &NewSession,
    expires_in_days: i64,
) -> Result<SessionRow, DbError> {
    let now = Utc::now();
    let expires_at = now + Duration::days(expires_in_days);
    let id = Uuid::new_v4().to_string();

    let row = sqlx::query_as::<_, SessionRow>(
        "INSERT INTO scraping_sessions \
             (id, profile_name, portal, cookies, local_storage, session_storage, \
              user_agent, viewport_width, viewport_height, is_authenticated, \
              is_valid, use_count, success_count, failure_count, created_at, \
              last_used_at, expires_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, 1, 1, 0, ?11, ?11, ?12) \
         ON CONFLICT (profile_name, portal) DO UPDATE SET \
             cookies          = excluded.cookies, \
             local_storage    = excluded.local_storage, \
             session_storage  = excluded.session_storage, \
             user_agent       = excluded.user_agent, \
             viewport_width   = excluded.viewport_width, \
             viewport_height  = excluded.viewport_height, \
             is_authenticated = excluded.is_authenticated, \
             is_valid         = 1, \
             success_count    = scraping_sessions.success_count + 1, \
             last_used_at     = excluded.last_used_at, \
             expires_at       = excluded.expires_at \
         RETURNING id, profile_name, portal, cookies, local_storage, session_storage, \
                   user_agent, viewport_width, viewport_height, is_authenticated, \
                   is_valid, use_count, success_count, failure_count, created_at, \
                   last_used_at, expires_at",
    )
    .bind(id)
    .bind(&session.profile_name)
    .bind(&session.portal)
    .bind(&session.cookies)
    .bind(&session.local_storage)
    .bind(&session.session_storage)
    .bind(&session.user_agent)
    .bind(session.viewport_width)
    .bind(session.viewport_height)
    .bind(session.is_authenticated)
    .bind(now)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks the session for a `(profile, portal)` pair invalid.
///
/// One-way: nothing un-invalidates a row except a later [`save_session`].
/// Returns the number of rows affected; zero means no such session existed,
/// which is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn invalidate_session(
    pool: &SqlitePool,
    profile_name: &str,
    portal: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE scraping_sessions \
         SET is_valid = 0, failure_count = failure_count + 1 \
         WHERE profile_name = ?1 AND portal = ?2",
    )
    .bind(profile_name)
    .bind(portal)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Returns every session row, valid or not, ordered by portal then profile.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<SessionRow>, DbError> {
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT id, profile_name, portal, cookies, local_storage, session_storage, \
                user_agent, viewport_width, viewport_height, is_authenticated, \
                is_valid, use_count, success_count, failure_count, created_at, \
                last_used_at, expires_at \
         FROM scraping_sessions \
         ORDER BY portal ASC, profile_name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
