use super::*;

fn sample_listing() -> RawListing {
    let mut listing = RawListing::new(
        "immobiliare_it",
        "https://www.immobiliare.it/annunci/12345.html",
    );
    listing.title = Some("Bellissimo appartamento in centro".to_string());
    listing.location = Some("Roma, Prati".to_string());
    listing.price = Some(250_000.0);
    listing.sqm = Some(80.0);
    listing.rooms = Some(3);
    listing.bathrooms = Some(1);
    listing
}

// -----------------------------------------------------------------------
// content_hash
// -----------------------------------------------------------------------

#[test]
fn content_hash_is_16_hex_chars() {
    let hash = content_hash(&sample_listing());
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn content_hash_ignores_case_and_whitespace() {
    let a = sample_listing();
    let mut b = sample_listing();
    b.title = Some("  BELLISSIMO Appartamento in centro ".to_string());
    b.location = Some(" roma, prati".to_string());
    assert_eq!(content_hash(&a), content_hash(&b));
}

#[test]
fn content_hash_ignores_source_url() {
    let a = sample_listing();
    let mut b = sample_listing();
    b.source_url = "https://www.casa.it/98765/".to_string();
    assert_eq!(content_hash(&a), content_hash(&b));
}

#[test]
fn content_hash_differs_on_price() {
    let a = sample_listing();
    let mut b = sample_listing();
    b.price = Some(260_000.0);
    assert_ne!(content_hash(&a), content_hash(&b));
}

#[test]
fn content_hash_missing_fields_are_stable() {
    let a = RawListing::new("casa_it", "https://www.casa.it/1/");
    let b = RawListing::new("casa_it", "https://www.casa.it/2/");
    assert_eq!(content_hash(&a), content_hash(&b));
}

// -----------------------------------------------------------------------
// generate_code
// -----------------------------------------------------------------------

#[test]
fn generate_code_has_expected_shape() {
    let now = chrono::DateTime::parse_from_rfc3339("2026-08-25T10:30:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let code = generate_code("immobiliare_it", now);
    let parts: Vec<&str> = code.splitn(3, '-').collect();
    assert_eq!(parts[0], "IMMOBILIARE_IT");
    assert_eq!(parts[1], "20260825103000");
    assert_eq!(parts[2].len(), 8);
}

#[test]
fn generate_code_is_unique_per_call() {
    let now = chrono::Utc::now();
    assert_ne!(generate_code("casa_it", now), generate_code("casa_it", now));
}

// -----------------------------------------------------------------------
// parse_location
// -----------------------------------------------------------------------

#[test]
fn parse_location_city_only() {
    let parsed = parse_location(Some("Roma"));
    assert_eq!(parsed.city.as_deref(), Some("Roma"));
    assert!(parsed.zone.is_none());
    assert!(parsed.street.is_none());
    assert!(parsed.province.is_none());
}

#[test]
fn parse_location_city_and_zone() {
    let parsed = parse_location(Some("Roma, Prati"));
    assert_eq!(parsed.city.as_deref(), Some("Roma"));
    assert_eq!(parsed.zone.as_deref(), Some("Prati"));
}

#[test]
fn parse_location_city_zone_street() {
    let parsed = parse_location(Some("Milano, Brera, Via Fiori Chiari"));
    assert_eq!(parsed.city.as_deref(), Some("Milano"));
    assert_eq!(parsed.zone.as_deref(), Some("Brera"));
    assert_eq!(parsed.street.as_deref(), Some("Via Fiori Chiari"));
}

#[test]
fn parse_location_extracts_province_code() {
    let parsed = parse_location(Some("Segrate (MI), Centro"));
    assert_eq!(parsed.city.as_deref(), Some("Segrate"));
    assert_eq!(parsed.province.as_deref(), Some("MI"));
    assert_eq!(parsed.zone.as_deref(), Some("Centro"));
}

#[test]
fn parse_location_empty_is_all_none() {
    assert_eq!(parse_location(Some("  ")), ParsedLocation::default());
    assert_eq!(parse_location(None), ParsedLocation::default());
}

// -----------------------------------------------------------------------
// infer_contract_type
// -----------------------------------------------------------------------

#[test]
fn contract_type_explicit_field_wins() {
    let mut listing = sample_listing();
    listing.contract_type = Some("Affitto".to_string());
    // URL says nothing about renting; the explicit field decides.
    assert_eq!(infer_contract_type(&listing), "rent");
}

#[test]
fn contract_type_from_url_vendita() {
    let listing = RawListing::new(
        "immobiliare_it",
        "https://www.immobiliare.it/vendita-case/milano/1.html",
    );
    assert_eq!(infer_contract_type(&listing), "sale");
}

#[test]
fn contract_type_from_url_affitto() {
    let listing = RawListing::new("casa_it", "https://www.casa.it/affitto/roma/42/");
    assert_eq!(infer_contract_type(&listing), "rent");
}

#[test]
fn contract_type_defaults_to_sale() {
    let listing = RawListing::new("casa_it", "https://www.casa.it/immobili/42/");
    assert_eq!(infer_contract_type(&listing), "sale");
}

// -----------------------------------------------------------------------
// infer_property_type
// -----------------------------------------------------------------------

#[test]
fn property_type_from_title_apartment() {
    assert_eq!(infer_property_type(&sample_listing()), "apartment");
}

#[test]
fn property_type_explicit_field_wins() {
    let mut listing = sample_listing();
    listing.property_type = Some("Villa".to_string());
    assert_eq!(infer_property_type(&listing), "villa");
}

#[test]
fn property_type_from_description() {
    let mut listing = RawListing::new("casa_it", "https://www.casa.it/1/");
    listing.description = Some("Luminoso ufficio open space".to_string());
    assert_eq!(infer_property_type(&listing), "office");
}

#[test]
fn property_type_unknown_is_other() {
    let mut listing = RawListing::new("casa_it", "https://www.casa.it/1/");
    listing.title = Some("Terreno edificabile".to_string());
    assert_eq!(infer_property_type(&listing), "other");
}

// -----------------------------------------------------------------------
// estimate_coordinates
// -----------------------------------------------------------------------

#[test]
fn coordinates_known_city() {
    let (lat, lon) = estimate_coordinates("Milano");
    assert!((lat - 45.4642).abs() < 1e-6);
    assert!((lon - 9.1900).abs() < 1e-6);
}

#[test]
fn coordinates_substring_match() {
    let (lat, _) = estimate_coordinates("Roma Capitale");
    assert!((lat - 41.9028).abs() < 1e-6);
}

#[test]
fn coordinates_unknown_city_falls_back_to_country_center() {
    assert_eq!(estimate_coordinates("Atlantide"), DEFAULT_COORDS);
}

// -----------------------------------------------------------------------
// map_listing
// -----------------------------------------------------------------------

#[test]
fn map_listing_sale_price_goes_to_price_sale() {
    let listing = sample_listing();
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert_eq!(mapped.price_sale, Some(250_000.0));
    assert!(mapped.price_rent_monthly.is_none());
}

#[test]
fn map_listing_rent_price_goes_to_monthly() {
    let mut listing = sample_listing();
    listing.contract_type = Some("affitto".to_string());
    listing.price = Some(1200.0);
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert!(mapped.price_sale.is_none());
    assert_eq!(mapped.price_rent_monthly, Some(1200.0));
}

#[test]
fn map_listing_notes_start_with_hash_line() {
    let listing = sample_listing();
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert!(mapped.internal_notes.starts_with(&format!("hash:{hash}\n")));
    assert!(mapped.internal_notes.contains("Source: immobiliare_it"));
}

#[test]
fn map_listing_fills_location_defaults() {
    let listing = RawListing::new("casa_it", "https://www.casa.it/1/");
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert_eq!(mapped.city, "Sconosciuta");
    assert_eq!(mapped.street, "Via sconosciuta");
    assert_eq!(mapped.province, "");
    assert_eq!((mapped.latitude, mapped.longitude), DEFAULT_COORDS);
}

#[test]
fn map_listing_estimates_coordinates_from_city() {
    let mut listing = sample_listing();
    listing.location = Some("Milano, Navigli".to_string());
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert!((mapped.latitude - 45.4642).abs() < 1e-6);
}

#[test]
fn map_listing_keeps_explicit_coordinates() {
    let mut listing = sample_listing();
    listing.latitude = Some(45.07);
    listing.longitude = Some(7.68);
    let hash = content_hash(&listing);
    let mapped = map_listing(&listing, &hash, chrono::Utc::now());
    assert!((mapped.latitude - 45.07).abs() < 1e-6);
    assert!((mapped.longitude - 7.68).abs() < 1e-6);
}
