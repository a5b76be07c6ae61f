//! Deduplicated ingestion of scraped listings into the `properties` table.
//!
//! A listing is checked against existing rows twice before insert: first by
//! exact `source_url`, then by the content hash stored as the first line of
//! `internal_notes`. Either match returns the existing row's id instead of
//! inserting again, so replaying a scrape is idempotent.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use immodb_core::RawListing;

use crate::DbError;

pub mod map;

pub use map::{
    content_hash, estimate_coordinates, generate_code, infer_contract_type, infer_property_type,
    map_listing, parse_location, NewProperty, ParsedLocation,
};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `properties` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub contract_type: String,
    pub property_type: String,
    pub status: String,
    pub street: String,
    pub city: String,
    pub zone: Option<String>,
    pub province: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sqm_commercial: Option<f64>,
    pub rooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub price_sale: Option<f64>,
    pub price_rent_monthly: Option<f64>,
    pub source: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub internal_notes: String,
    pub verified: bool,
    pub import_date: DateTime<Utc>,
}

/// How a single listing was resolved against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new row was created with this id.
    Inserted(String),
    /// A row with the same `source_url` already existed; its id is returned.
    DuplicateUrl(String),
    /// A row with the same content hash already existed; its id is returned.
    DuplicateContent(String),
}

impl SaveOutcome {
    /// The canonical property id this listing resolved to.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            SaveOutcome::Inserted(id)
            | SaveOutcome::DuplicateUrl(id)
            | SaveOutcome::DuplicateContent(id) => id,
        }
    }

    /// True only when a new row was inserted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, SaveOutcome::Inserted(_))
    }
}

/// Per-item counts for a batch save. One item's failure never aborts the
/// rest; its message is collected here instead.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub saved: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Saves one listing, deduplicating by URL first and content hash second.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn save_property(
    pool: &SqlitePool,
    listing: &RawListing,
) -> Result<SaveOutcome, DbError> {
    let existing = sqlx::query_scalar::<_, String>(
        "SELECT id FROM properties WHERE source_url = ?1 LIMIT 1",
    )
    .bind(&listing.source_url)
    .fetch_optional(pool)
    .await?;

    if let Some(id) = existing {
        return Ok(SaveOutcome::DuplicateUrl(id));
    }

    let hash = content_hash(listing);
    // The hash is the first line of internal_notes; hex only, safe in LIKE.
    let existing = sqlx::query_scalar::<_, String>(
        "SELECT id FROM properties WHERE internal_notes LIKE ?1 LIMIT 1",
    )
    .bind(format!("hash:{hash}%"))
    .fetch_optional(pool)
    .await?;

    if let Some(id) = existing {
        return Ok(SaveOutcome::DuplicateContent(id));
    }

    let property = map_listing(listing, &hash, Utc::now());

    let id = sqlx::query_scalar::<_, String>(
        "INSERT INTO properties \
             (id, code, title, description, contract_type, property_type, status, \
              street, city, zone, province, latitude, longitude, sqm_commercial, \
              rooms, bathrooms, price_sale, price_rent_monthly, source, source_url, \
              image_url, internal_notes, verified, import_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'draft', ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
                 ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, 0, ?22) \
         RETURNING id",
    )
    .bind(&property.id)
    .bind(&property.code)
    .bind(&property.title)
    .bind(&property.description)
    .bind(&property.contract_type)
    .bind(&property.property_type)
    .bind(&property.street)
    .bind(&property.city)
    .bind(&property.zone)
    .bind(&property.province)
    .bind(property.latitude)
    .bind(property.longitude)
    .bind(property.sqm_commercial)
    .bind(property.rooms)
    .bind(property.bathrooms)
    .bind(property.price_sale)
    .bind(property.price_rent_monthly)
    .bind(&property.source)
    .bind(&property.source_url)
    .bind(&property.image_url)
    .bind(&property.internal_notes)
    .bind(property.import_date)
    .fetch_one(pool)
    .await?;

    Ok(SaveOutcome::Inserted(id))
}

/// Saves every listing in the slice, isolating failures per item.
///
/// Duplicates of either kind count as `skipped`; only fresh inserts count
/// as `saved`. Per-item errors land in the summary instead of aborting the
/// batch.
pub async fn save_properties_batch(pool: &SqlitePool, listings: &[RawListing]) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for listing in listings {
        match save_property(pool, listing).await {
            Ok(outcome) if outcome.is_new() => summary.saved += 1,
            Ok(_) => summary.skipped += 1,
            Err(e) => summary
                .errors
                .push(format!("{}: {e}", listing.source_url)),
        }
    }

    summary
}

/// Lists properties newest-first, optionally filtered by source portal and
/// city substring (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_properties(
    pool: &SqlitePool,
    source: Option<&str>,
    city: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PropertyRow>, DbError> {
    let rows = sqlx::query_as::<_, PropertyRow>(
        "SELECT id, code, title, description, contract_type, property_type, status, \
                street, city, zone, province, latitude, longitude, sqm_commercial, \
                rooms, bathrooms, price_sale, price_rent_monthly, source, source_url, \
                image_url, internal_notes, verified, import_date \
         FROM properties \
         WHERE (?1 IS NULL OR source = ?1) \
           AND (?2 IS NULL OR city LIKE '%' || ?2 || '%') \
         ORDER BY import_date DESC, id DESC \
         LIMIT ?3 OFFSET ?4",
    )
    .bind(source)
    .bind(city)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts properties matching the same filters as [`list_properties`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_properties(
    pool: &SqlitePool,
    source: Option<&str>,
    city: Option<&str>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM properties \
         WHERE (?1 IS NULL OR source = ?1) \
           AND (?2 IS NULL OR city LIKE '%' || ?2 || '%')",
    )
    .bind(source)
    .bind(city)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
