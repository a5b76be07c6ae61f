//! Portal scrapers: the [`PortalScraper`] contract, its concrete
//! implementations, and the name registry.
//!
//! A portal implementation supplies URL building, card parsing, and
//! readiness hints; the provided [`PortalScraper::scrape_search`] drives the
//! shared pagination loop against a [`PageFetcher`]. Parsing works on
//! captured markup only, so every portal is testable on fixture strings.

use std::time::Duration;

use async_trait::async_trait;
use immodb_core::{AppConfig, RawListing, SearchFilters};
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;

use crate::fetch::PageFetcher;

mod casa_it;
mod immobiliare_it;

pub use casa_it::CasaIt;
pub use immobiliare_it::ImmobiliareIt;

/// Run-wide guard rails for a search scrape.
#[derive(Debug, Clone)]
pub struct ScrapeLimits {
    pub max_pages_cap: u32,
    pub max_listings: usize,
    pub inter_page_delay: Duration,
}

impl ScrapeLimits {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_pages_cap: config.scraper_max_pages_per_search,
            max_listings: config.scraper_max_listings_per_run,
            inter_page_delay: Duration::from_millis(config.scraper_inter_page_delay_ms),
        }
    }
}

/// What a search run produced: parsed listings plus the soft errors that
/// did not stop it.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub listings: Vec<RawListing>,
    pub errors: Vec<String>,
}

/// One supported real-estate portal.
#[async_trait]
pub trait PortalScraper: Send + Sync {
    /// Stable portal identifier, e.g. `"immobiliare_it"`.
    fn portal_name(&self) -> &'static str;

    /// Origin all relative listing links resolve against.
    fn base_url(&self) -> &'static str;

    /// Portal-specific pacing override. `None` uses the configured default.
    fn requests_per_second(&self) -> Option<f64> {
        None
    }

    /// Selector that signals search results have rendered. `None` relies on
    /// the fetcher's settle delay alone.
    fn content_selector(&self) -> Option<&'static str>;

    /// Builds the search URL for `page` (1-based) from the job filters.
    fn search_url(&self, filters: &SearchFilters, page: u32) -> String;

    /// Parses every listing card on a search results page. Card-level
    /// failures are skipped, never propagated.
    fn parse_search_page(&self, html: &str, page_url: &str) -> Vec<RawListing>;

    /// Parses a listing detail page. Portals without detail support return
    /// `None`.
    fn parse_listing(&self, html: &str, url: &str) -> Option<RawListing> {
        let _ = (html, url);
        None
    }

    /// Authentication probe over captured markup: `Some(true)` when a
    /// logout affordance is visible, `Some(false)` when a login form is,
    /// `None` when neither marker matches.
    fn is_authenticated(&self, html: &str) -> Option<bool> {
        default_auth_probe(html)
    }

    /// Runs the shared pagination loop: fetch pages in ascending order,
    /// stop early on the first page without listings, cap the total, and
    /// record per-page fetch failures as soft errors. The first successful
    /// fetch also drives the authentication probe and session bookkeeping.
    async fn scrape_search(
        &self,
        fetcher: &dyn PageFetcher,
        filters: &SearchFilters,
        max_pages: u32,
        limits: &ScrapeLimits,
    ) -> ScrapeOutcome {
        let portal = self.portal_name();
        let last_page = max_pages.clamp(1, limits.max_pages_cap);
        let mut outcome = ScrapeOutcome::default();
        let mut auth_checked = false;

        for page in 1..=last_page {
            if page > 1 {
                sleep(limits.inter_page_delay).await;
            }
            let url = self.search_url(filters, page);
            tracing::info!(portal, page, last_page, url = %url, "fetching search page");

            let html = match fetcher.fetch(&url, self.content_selector()).await {
                Ok(html) => html,
                Err(error) => {
                    tracing::warn!(portal, page, %error, "search page fetch failed; continuing");
                    outcome.errors.push(format!("page {page}: {error}"));
                    continue;
                }
            };

            if !auth_checked {
                auth_checked = true;
                let authenticated = match self.is_authenticated(&html) {
                    Some(authenticated) => authenticated,
                    None => {
                        tracing::debug!(portal, "no authentication markers; assuming authenticated");
                        true
                    }
                };
                if !authenticated {
                    tracing::warn!(portal, "page shows a login form; continuing unauthenticated");
                }
                if let Err(error) = fetcher.record_auth_outcome(authenticated).await {
                    tracing::warn!(portal, %error, "could not record session outcome");
                }
            }

            let listings = self.parse_search_page(&html, &url);
            if listings.is_empty() {
                tracing::info!(portal, page, "page yielded no listings; stopping pagination");
                break;
            }
            tracing::info!(portal, page, count = listings.len(), "parsed listing cards");
            outcome.listings.extend(listings);

            if outcome.listings.len() >= limits.max_listings {
                outcome.listings.truncate(limits.max_listings);
                tracing::warn!(
                    portal,
                    cap = limits.max_listings,
                    "listing cap reached; stopping pagination"
                );
                break;
            }
        }

        tracing::info!(
            portal,
            listings = outcome.listings.len(),
            soft_errors = outcome.errors.len(),
            "search scrape finished"
        );
        outcome
    }
}

/// DOM heuristic shared by portals without a stronger signal: a logout
/// affordance means authenticated, a login form means not, anything else is
/// ambiguous. Link/button text is matched on whole words so `"riesci"`
/// never counts as `"esci"`.
#[must_use]
pub fn default_auth_probe(html: &str) -> Option<bool> {
    const LOGOUT_SELECTORS: [&str; 3] = [
        "a[href*='logout']",
        "[data-testid='logout']",
        "form[action*='logout']",
    ];
    const LOGIN_SELECTORS: [&str; 2] = ["form[action*='login']", "input[type='password']"];
    const LOGOUT_WORDS: [&str; 2] = ["logout", "esci"];
    const LOGIN_WORDS: [&str; 2] = ["login", "accedi"];

    let doc = Html::parse_document(html);
    let root = doc.root_element();

    if matches_any(root, &LOGOUT_SELECTORS) || action_text_matches(root, &LOGOUT_WORDS) {
        return Some(true);
    }
    if matches_any(root, &LOGIN_SELECTORS) || action_text_matches(root, &LOGIN_WORDS) {
        return Some(false);
    }
    None
}

fn matches_any(root: ElementRef<'_>, selectors: &[&str]) -> bool {
    selectors.iter().any(|raw| {
        Selector::parse(raw).is_ok_and(|selector| root.select(&selector).next().is_some())
    })
}

fn action_text_matches(root: ElementRef<'_>, words: &[&str]) -> bool {
    let Ok(selector) = Selector::parse("a, button") else {
        return false;
    };
    root.select(&selector).any(|element| {
        let text = element.text().collect::<String>().to_lowercase();
        let text = text.trim();
        words
            .iter()
            .any(|word| text == *word || text.starts_with(&format!("{word} ")))
    })
}

/// Looks up the scraper registered for a portal name.
#[must_use]
pub fn scraper_for(portal: &str) -> Option<Box<dyn PortalScraper>> {
    match portal {
        immobiliare_it::PORTAL => Some(Box::new(ImmobiliareIt)),
        casa_it::PORTAL => Some(Box::new(CasaIt)),
        _ => None,
    }
}

/// Portal names with a registered scraper.
#[must_use]
pub fn known_portals() -> [&'static str; 2] {
    [immobiliare_it::PORTAL, casa_it::PORTAL]
}

#[cfg(test)]
#[path = "portals_test.rs"]
mod tests;
