//! casa.it: URL building, card parsing and detail-page parsing.

use async_trait::async_trait;
use immodb_core::{location_slug, RawListing, SearchFilters, CONTRACT_RENT};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::PortalScraper;
use crate::parse::{absolutize, parse_decimal_price, select_first_attr, select_first_text};

pub(crate) const PORTAL: &str = "casa_it";
const BASE_URL: &str = "https://www.casa.it";

const CARD_SELECTOR: &str = ".listing-item";

/// Scraper for casa.it search results and detail pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct CasaIt;

#[async_trait]
impl PortalScraper for CasaIt {
    fn portal_name(&self) -> &'static str {
        PORTAL
    }

    fn base_url(&self) -> &'static str {
        BASE_URL
    }

    fn content_selector(&self) -> Option<&'static str> {
        Some(CARD_SELECTOR)
    }

    fn search_url(&self, filters: &SearchFilters, page: u32) -> String {
        let contract_path = if filters.contract_type == CONTRACT_RENT {
            "affitto"
        } else {
            "vendita"
        };
        let slug = location_slug(&filters.location);
        let mut url = format!("{BASE_URL}/{contract_path}/{slug}");

        let mut params = Vec::new();
        if let Some(price_min) = filters.price_min {
            params.push(format!("prezzoMin={}", price_min.trunc()));
        }
        if let Some(price_max) = filters.price_max {
            params.push(format!("prezzoMax={}", price_max.trunc()));
        }
        if page > 1 {
            params.push(format!("page={page}"));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    fn parse_search_page(&self, html: &str, page_url: &str) -> Vec<RawListing> {
        let doc = Html::parse_document(html);
        let Ok(selector) = Selector::parse(CARD_SELECTOR) else {
            return Vec::new();
        };

        let listings: Vec<_> = doc
            .root_element()
            .select(&selector)
            .filter_map(|card| parse_card(card, page_url))
            .collect();
        if listings.is_empty() {
            tracing::warn!(url = page_url, "no listing cards found");
        }
        listings
    }

    fn parse_listing(&self, html: &str, url: &str) -> Option<RawListing> {
        let listing_id = listing_id_from(url)?;
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        let mut listing = RawListing::new(PORTAL, url);
        listing.listing_id = Some(listing_id);
        listing.title = select_first_text(root, &[".detail-page__title"]);
        listing.description = select_first_text(root, &[".detail-page__description"]);
        listing.price_text = select_first_text(root, &[".detail-page__price"]);
        listing.price = listing.price_text.as_deref().and_then(parse_decimal_price);
        listing.location = select_first_text(root, &[".detail-page__location"]);
        listing.contract_type = Some(contract_from_url(url).to_string());
        Some(listing)
    }
}

// Cards without a stable numeric listing id are dropped rather than ingested
// under a synthetic key.
fn parse_card(card: ElementRef<'_>, page_url: &str) -> Option<RawListing> {
    let href = select_first_attr(card, &["a.listing-item__link"], "href")?;
    let url = absolutize(BASE_URL, &href);
    let listing_id = listing_id_from(&url)?;

    let mut listing = RawListing::new(PORTAL, &url);
    listing.listing_id = Some(listing_id);
    listing.title = select_first_text(card, &[".listing-item__title"]);
    listing.price_text = select_first_text(card, &[".listing-item__price"]);
    listing.price = listing.price_text.as_deref().and_then(parse_decimal_price);
    listing.location = select_first_text(card, &[".listing-item__location"]);
    listing.contract_type = Some(contract_from_url(page_url).to_string());
    Some(listing)
}

fn contract_from_url(url: &str) -> &'static str {
    if url.contains("/affitto/") {
        "affitto"
    } else {
        "vendita"
    }
}

fn listing_id_from(url: &str) -> Option<String> {
    let pattern = Regex::new(r"/(\d+)/").expect("valid listing id regex");
    pattern
        .captures(url)
        .map(|captures| captures[1].to_string())
}
