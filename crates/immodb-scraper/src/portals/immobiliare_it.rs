//! immobiliare.it: URL building and card parsing.

use async_trait::async_trait;
use immodb_core::{location_slug, RawListing, SearchFilters};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::PortalScraper;
use crate::parse::{
    absolutize, parse_features, parse_price, select_all_texts, select_first_attr,
    select_first_text,
};

pub(crate) const PORTAL: &str = "immobiliare_it";
const BASE_URL: &str = "https://www.immobiliare.it";

/// Result cards appear under one of these, depending on markup generation.
const CARD_SELECTORS: [&str; 4] = [
    "div[class*='nd-list__item']",
    "div[class*='in-card']",
    "div[data-testid='ad-item']",
    "article[class*='realEstate']",
];
const TITLE_SELECTORS: [&str; 4] = [
    "a[class*='title']",
    "h2",
    "div[class*='titolo']",
    "[class*='nd-title']",
];
const PRICE_SELECTORS: [&str; 4] = [
    "li[class*='price']",
    "div[class*='prezzo']",
    "span[class*='price']",
    "[class*='nd-list__item'][class*='price']",
];
const LOCATION_SELECTORS: [&str; 3] = [
    "div[class*='location']",
    "span[class*='localita']",
    "[class*='nd-list__item'][class*='location']",
];
const FEATURE_SELECTOR: &str = "ul li, div[class*='feature'], span[class*='caratteristiche']";

/// Scraper for immobiliare.it search results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmobiliareIt;

#[async_trait]
impl PortalScraper for ImmobiliareIt {
    fn portal_name(&self) -> &'static str {
        PORTAL
    }

    fn base_url(&self) -> &'static str {
        BASE_URL
    }

    fn requests_per_second(&self) -> Option<f64> {
        // immobiliare.it throttles aggressively; one request per two seconds.
        Some(0.5)
    }

    fn content_selector(&self) -> Option<&'static str> {
        Some("[class*='nd-list__item'], [class*='in-card']")
    }

    fn search_url(&self, filters: &SearchFilters, page: u32) -> String {
        let slug = location_slug(&filters.location);
        let mut url = format!("{BASE_URL}/{}-case/{slug}/", filters.contract_type);

        let mut params = Vec::new();
        if let Some(property_type) = &filters.property_type {
            params.push(format!("tipoImmobile={property_type}"));
        }
        if let Some(price_min) = filters.price_min {
            params.push(format!("prezzoMinimo={}", price_min.trunc()));
        }
        if let Some(price_max) = filters.price_max {
            params.push(format!("prezzoMassimo={}", price_max.trunc()));
        }
        if let Some(rooms_min) = filters.rooms_min {
            params.push(format!("localiMinimo={rooms_min}"));
        }
        if let Some(sqm_min) = filters.sqm_min {
            params.push(format!("superficieMinima={}", sqm_min.trunc()));
        }
        if page > 1 {
            params.push(format!("pag={page}"));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    fn parse_search_page(&self, html: &str, page_url: &str) -> Vec<RawListing> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        // First card selector with any matches wins the page.
        for raw in CARD_SELECTORS {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            let cards: Vec<_> = root.select(&selector).collect();
            if cards.is_empty() {
                continue;
            }
            tracing::debug!(selector = raw, count = cards.len(), "matched listing cards");
            return cards.into_iter().filter_map(parse_card).collect();
        }

        tracing::warn!(url = page_url, "no listing cards matched any known selector");
        Vec::new()
    }
}

fn parse_card(card: ElementRef<'_>) -> Option<RawListing> {
    let href = select_first_attr(card, &["a"], "href")?;
    let url = absolutize(BASE_URL, &href);

    let mut listing = RawListing::new(PORTAL, &url);
    listing.listing_id = listing_id_from(&url);
    listing.title = select_first_text(card, &TITLE_SELECTORS);
    listing.price_text = select_first_text(card, &PRICE_SELECTORS);
    listing.price = listing.price_text.as_deref().and_then(parse_price);
    listing.location = select_first_text(card, &LOCATION_SELECTORS);

    let features = parse_features(&select_all_texts(card, FEATURE_SELECTOR));
    listing.sqm = features.sqm;
    listing.rooms = features.rooms;
    listing.bathrooms = features.bathrooms;

    listing.image_url = select_first_attr(card, &["img"], "src")
        .or_else(|| select_first_attr(card, &["img"], "data-src"));
    Some(listing)
}

fn listing_id_from(url: &str) -> Option<String> {
    let pattern = Regex::new(r"/(\d+)\.html").expect("valid listing id regex");
    pattern
        .captures(url)
        .map(|captures| captures[1].to_string())
}
