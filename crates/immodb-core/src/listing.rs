//! Domain types shared between the scraper and ingestion layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Portal-native slug for sale searches.
pub const CONTRACT_SALE: &str = "vendita";
/// Portal-native slug for rental searches.
pub const CONTRACT_RENT: &str = "affitto";

/// One listing as scraped from a portal card or detail page.
///
/// Every field except `source`, `source_url`, and `scraped_at` is optional:
/// portal markup churns, and a card missing a price or a size is still worth
/// keeping. Ingestion decides later what is usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub source: String,
    pub source_url: String,
    pub listing_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub price_text: Option<String>,
    pub location: Option<String>,
    pub sqm: Option<f64>,
    pub rooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub contract_type: Option<String>,
    pub property_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}

impl RawListing {
    /// A listing with only the mandatory fields set.
    #[must_use]
    pub fn new(source: &str, source_url: &str) -> Self {
        Self {
            source: source.to_string(),
            source_url: source_url.to_string(),
            listing_id: None,
            title: None,
            price: None,
            price_text: None,
            location: None,
            sqm: None,
            rooms: None,
            bathrooms: None,
            image_url: None,
            description: None,
            contract_type: None,
            property_type: None,
            latitude: None,
            longitude: None,
            scraped_at: Utc::now(),
        }
    }
}

/// Search parameters a portal turns into a results URL.
///
/// `contract_type` holds the portal-native slug (`vendita` / `affitto`);
/// everything else is optional and omitted from the URL when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    pub location: String,
    pub contract_type: String,
    pub property_type: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rooms_min: Option<u32>,
    pub rooms_max: Option<u32>,
    pub sqm_min: Option<f64>,
    pub sqm_max: Option<f64>,
}

impl SearchFilters {
    /// Sale search for a location with no further constraints.
    #[must_use]
    pub fn for_location(location: &str) -> Self {
        Self {
            location: location.to_string(),
            contract_type: CONTRACT_SALE.to_string(),
            property_type: None,
            price_min: None,
            price_max: None,
            rooms_min: None,
            rooms_max: None,
            sqm_min: None,
            sqm_max: None,
        }
    }
}

/// Generate a URL-safe slug from a location name.
#[must_use]
pub fn location_slug(location: &str) -> String {
    location
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
