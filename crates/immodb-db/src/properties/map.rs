//! Pure mapping from a scraped listing to a canonical property record.
//!
//! Everything here is deterministic string/number work with no database
//! access: code generation, location decomposition, contract/property type
//! inference, the coordinate fallback table, and the dedup content hash.

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use immodb_core::RawListing;

/// Fallback coordinates for major Italian cities, matched by substring
/// against the lowercased city name. A geocoder would replace this table.
const CITY_COORDS: [(&str, f64, f64); 10] = [
    ("roma", 41.9028, 12.4964),
    ("milano", 45.4642, 9.1900),
    ("napoli", 40.8518, 14.2681),
    ("torino", 45.0703, 7.6869),
    ("firenze", 43.7696, 11.2558),
    ("bologna", 44.4949, 11.3426),
    ("venezia", 45.4408, 12.3155),
    ("verona", 45.4384, 10.9916),
    ("genova", 44.4056, 8.9463),
    ("palermo", 38.1157, 13.3615),
];

/// Country-center fallback when no city matches.
const DEFAULT_COORDS: (f64, f64) = (42.5, 12.5);

/// All column values for a new `properties` row, ready to insert.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub contract_type: String,
    pub property_type: String,
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
    pub import_date: DateTime<Utc>,
}

/// Components of a free-text portal location string.
///
/// `"Milano, Brera, Via Fiori Chiari"` splits into city, zone, and street;
/// `"Segrate (MI)"` yields the province code with the parenthetical removed
/// from the city.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub zone: Option<String>,
    pub street: Option<String>,
    pub province: Option<String>,
}

/// Dedup hash over the normalized `{title, location, price, sqm}` tuple.
///
/// Text fields are lowercased and trimmed; numbers are taken as-is. The
/// fields are serialized with sorted keys so the digest is stable, and the
/// first 16 hex characters are kept.
#[must_use]
pub fn content_hash(listing: &RawListing) -> String {
    let key_data = serde_json::json!({
        "title": normalized(listing.title.as_deref()),
        "location": normalized(listing.location.as_deref()),
        "price": listing.price,
        "sqm": listing.sqm,
    });

    let digest = format!("{:x}", Sha256::digest(key_data.to_string().as_bytes()));
    digest[..16].to_string()
}

fn normalized(text: Option<&str>) -> String {
    text.unwrap_or("").to_lowercase().trim().to_string()
}

/// Synthetic property code: `SOURCE-YYYYMMDDHHMMSS-xxxxxxxx`.
#[must_use]
pub fn generate_code(source: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", source.to_uppercase(), timestamp, &suffix[..8])
}

/// Decomposes a portal location string into city/zone/street/province.
///
/// Comma-separated parts map positionally; a two-letter parenthesized
/// province code anywhere in the city part is extracted and stripped.
#[must_use]
pub fn parse_location(raw: Option<&str>) -> ParsedLocation {
    let Some(raw) = raw else {
        return ParsedLocation::default();
    };
    if raw.trim().is_empty() {
        return ParsedLocation::default();
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();

    let mut city = parts.first().map(|s| (*s).to_string());
    let zone = parts.get(1).map(|s| (*s).to_string());
    let street = parts.get(2).map(|s| (*s).to_string());

    let mut province = None;
    if let Some(ref c) = city {
        let province_re = Regex::new(r"\(([A-Z]{2})\)").expect("valid province regex");
        if let Some(cap) = province_re.captures(c) {
            province = cap.get(1).map(|m| m.as_str().to_string());
            let strip_re = Regex::new(r"\s*\([A-Z]{2}\)").expect("valid province strip regex");
            city = Some(strip_re.replace_all(c, "").trim().to_string());
        }
    }

    ParsedLocation {
        city,
        zone,
        street,
        province,
    }
}

/// Canonical contract type (`sale` / `rent`) for a listing.
///
/// An explicit field wins, then URL substrings, then `sale`.
#[must_use]
pub fn infer_contract_type(listing: &RawListing) -> String {
    if let Some(ref contract) = listing.contract_type {
        let contract = contract.to_lowercase();
        if contract.contains("vendita") || contract.contains("sale") {
            return "sale".to_string();
        }
        if contract.contains("affitto") || contract.contains("rent") {
            return "rent".to_string();
        }
    }

    let url = listing.source_url.to_lowercase();
    if url.contains("vendita") || url.contains("sale") {
        return "sale".to_string();
    }
    if url.contains("affitto") || url.contains("rent") {
        return "rent".to_string();
    }

    "sale".to_string()
}

/// Canonical property type for a listing.
///
/// An explicit field wins; otherwise title and description are scanned for
/// Italian and English keywords, falling back to `other`.
#[must_use]
pub fn infer_property_type(listing: &RawListing) -> String {
    let text = match listing.property_type {
        Some(ref explicit) => explicit.to_lowercase(),
        None => {
            let title = listing.title.as_deref().unwrap_or("").to_lowercase();
            let desc = listing.description.as_deref().unwrap_or("").to_lowercase();
            format!("{title} {desc}")
        }
    };

    if text.contains("appartamento") || text.contains("apartment") {
        "apartment".to_string()
    } else if text.contains("villa") {
        "villa".to_string()
    } else if text.contains("casa") || text.contains("house") {
        "house".to_string()
    } else if text.contains("ufficio") || text.contains("office") {
        "office".to_string()
    } else if text.contains("negozio") || text.contains("commercial") {
        "commercial".to_string()
    } else {
        "other".to_string()
    }
}

/// Best-effort coordinates for a city name.
#[must_use]
pub fn estimate_coordinates(city: &str) -> (f64, f64) {
    let city_lower = city.to_lowercase();
    for (known_city, lat, lon) in CITY_COORDS {
        if city_lower.contains(known_city) {
            return (lat, lon);
        }
    }
    DEFAULT_COORDS
}

/// Builds the full insert payload for a listing.
///
/// The dedup hash is stored as the first line of `internal_notes` so the
/// content-duplicate check can match it by prefix.
#[must_use]
pub fn map_listing(listing: &RawListing, hash: &str, now: DateTime<Utc>) -> NewProperty {
    let location = parse_location(listing.location.as_deref());
    let contract_type = infer_contract_type(listing);
    let property_type = infer_property_type(listing);

    let (latitude, longitude) = match (listing.latitude, listing.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => estimate_coordinates(location.city.as_deref().unwrap_or("")),
    };

    let price_sale = if contract_type == "sale" {
        listing.price
    } else {
        None
    };
    let price_rent_monthly = if contract_type == "rent" {
        listing.price
    } else {
        None
    };

    let internal_notes = format!(
        "hash:{hash}\nScraped at: {}\nSource: {}",
        listing.scraped_at.to_rfc3339(),
        listing.source,
    );

    NewProperty {
        id: Uuid::new_v4().to_string(),
        code: generate_code(&listing.source, now),
        title: listing.title.clone().unwrap_or_default(),
        description: listing.description.clone().unwrap_or_default(),
        contract_type,
        property_type,
        street: location
            .street
            .unwrap_or_else(|| "Via sconosciuta".to_string()),
        city: location.city.unwrap_or_else(|| "Sconosciuta".to_string()),
        zone: location.zone,
        province: location.province.unwrap_or_default(),
        latitude,
        longitude,
        sqm_commercial: listing.sqm,
        rooms: listing.rooms.map(i64::from),
        bathrooms: listing.bathrooms.map(i64::from),
        price_sale,
        price_rent_monthly,
        source: listing.source.clone(),
        source_url: listing.source_url.clone(),
        image_url: listing.image_url.clone(),
        internal_notes,
        import_date: now,
    }
}

#[cfg(test)]
#[path = "map_test.rs"]
mod tests;
