use std::collections::VecDeque;
use std::sync::Mutex;

use super::*;
use crate::error::ScraperError;
use immodb_core::CONTRACT_RENT;

const EMPTY_PAGE: &str = "<html><body><p>Nessun risultato trovato</p></body></html>";

const LOGIN_PAGE: &str = r#"<html><body>
    <form action="/auth/login"><input type="password" name="pw"></form>
</body></html>"#;

fn limits() -> ScrapeLimits {
    ScrapeLimits {
        max_pages_cap: 10,
        max_listings: 100,
        inter_page_delay: Duration::from_millis(200),
    }
}

fn card(id: u64) -> String {
    format!(
        r#"<div class="nd-list__item">
            <a class="in-card__title" href="/annunci/{id}.html">Annuncio {id}</a>
            <span class="in-list__price">€ 450.000</span>
        </div>"#
    )
}

fn search_page(cards: &[String]) -> String {
    format!("<html><body>{}</body></html>", cards.join("\n"))
}

/// Serves queued pages in order and records what the pagination loop asked
/// for.
struct StubFetcher {
    pages: Mutex<VecDeque<Result<String, ScraperError>>>,
    fetched: Mutex<Vec<String>>,
    auth_outcomes: Mutex<Vec<bool>>,
}

impl StubFetcher {
    fn with_pages(pages: Vec<Result<String, ScraperError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().collect()),
            fetched: Mutex::new(Vec::new()),
            auth_outcomes: Mutex::new(Vec::new()),
        }
    }

    fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().expect("fetched lock").clone()
    }

    fn recorded_outcomes(&self) -> Vec<bool> {
        self.auth_outcomes.lock().expect("auth lock").clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &str,
        _readiness_selector: Option<&str>,
    ) -> Result<String, ScraperError> {
        self.fetched
            .lock()
            .expect("fetched lock")
            .push(url.to_string());
        self.pages
            .lock()
            .expect("pages lock")
            .pop_front()
            .expect("stub fetcher ran out of queued pages")
    }

    async fn record_auth_outcome(&self, authenticated: bool) -> Result<(), ScraperError> {
        self.auth_outcomes
            .lock()
            .expect("auth lock")
            .push(authenticated);
        Ok(())
    }
}

// --- scrape_search pagination ---

#[tokio::test(start_paused = true)]
async fn pagination_stops_at_first_empty_page() {
    let fetcher = StubFetcher::with_pages(vec![
        Ok(search_page(&[card(111)])),
        Ok(search_page(&[card(222)])),
        Ok(EMPTY_PAGE.to_string()),
        Ok(search_page(&[card(333)])),
        Ok(search_page(&[card(444)])),
    ]);
    let filters = SearchFilters::for_location("Milano");

    let outcome = ImmobiliareIt
        .scrape_search(&fetcher, &filters, 5, &limits())
        .await;

    assert_eq!(fetcher.fetched_urls().len(), 3);
    assert_eq!(outcome.listings.len(), 2);
    assert!(outcome.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn listing_cap_truncates_and_stops_pagination() {
    let page = search_page(&[card(1), card(2)]);
    let fetcher = StubFetcher::with_pages(vec![
        Ok(page.clone()),
        Ok(page.clone()),
        Ok(page.clone()),
        Ok(page),
    ]);
    let filters = SearchFilters::for_location("Milano");
    let mut limits = limits();
    limits.max_listings = 3;

    let outcome = ImmobiliareIt
        .scrape_search(&fetcher, &filters, 4, &limits)
        .await;

    assert_eq!(outcome.listings.len(), 3);
    assert_eq!(fetcher.fetched_urls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn requested_pages_are_clamped_to_the_configured_cap() {
    let page = search_page(&[card(1)]);
    let fetcher = StubFetcher::with_pages(vec![Ok(page.clone()), Ok(page)]);
    let filters = SearchFilters::for_location("Milano");
    let mut limits = limits();
    limits.max_pages_cap = 2;

    ImmobiliareIt
        .scrape_search(&fetcher, &filters, 99, &limits)
        .await;

    assert_eq!(fetcher.fetched_urls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_is_soft_and_pagination_continues() {
    let fetcher = StubFetcher::with_pages(vec![
        Err(ScraperError::Timeout {
            what: "page content".into(),
            timeout_secs: 30,
        }),
        Ok(search_page(&[card(555)])),
        Ok(EMPTY_PAGE.to_string()),
    ]);
    let filters = SearchFilters::for_location("Milano");

    let outcome = ImmobiliareIt
        .scrape_search(&fetcher, &filters, 5, &limits())
        .await;

    assert_eq!(outcome.listings.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(
        outcome.errors[0].starts_with("page 1:"),
        "got: {:?}",
        outcome.errors
    );
    // The session probe runs on the first page that actually loads.
    assert_eq!(fetcher.recorded_outcomes(), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn login_wall_is_recorded_and_yields_nothing() {
    let fetcher = StubFetcher::with_pages(vec![Ok(LOGIN_PAGE.to_string())]);
    let filters = SearchFilters::for_location("Milano");

    let outcome = ImmobiliareIt
        .scrape_search(&fetcher, &filters, 3, &limits())
        .await;

    assert_eq!(fetcher.recorded_outcomes(), vec![false]);
    assert!(outcome.listings.is_empty());
    assert_eq!(fetcher.fetched_urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn ambiguous_page_is_assumed_authenticated() {
    let fetcher = StubFetcher::with_pages(vec![
        Ok(search_page(&[card(777)])),
        Ok(EMPTY_PAGE.to_string()),
    ]);
    let filters = SearchFilters::for_location("Milano");

    ImmobiliareIt
        .scrape_search(&fetcher, &filters, 2, &limits())
        .await;

    assert_eq!(fetcher.recorded_outcomes(), vec![true]);
}

// --- default_auth_probe ---

#[test]
fn logout_link_means_authenticated() {
    let html = r#"<html><body><a href="/account/logout">Esci</a></body></html>"#;
    assert_eq!(default_auth_probe(html), Some(true));
}

#[test]
fn password_input_means_login_wall() {
    assert_eq!(default_auth_probe(LOGIN_PAGE), Some(false));
}

#[test]
fn logout_affordance_wins_over_login_form() {
    let html = r#"<html><body>
        <a href="/logout">Logout</a>
        <form action="/login"><input type="password"></form>
    </body></html>"#;
    assert_eq!(default_auth_probe(html), Some(true));
}

#[test]
fn action_words_match_whole_words_only() {
    let html = r#"<html><body><a href="/faq">Riesci a trovarlo?</a></body></html>"#;
    assert_eq!(default_auth_probe(html), None);
}

#[test]
fn plain_page_is_ambiguous() {
    let html = "<html><body><p>Benvenuto</p></body></html>";
    assert_eq!(default_auth_probe(html), None);
}

// --- immobiliare.it URLs ---

#[test]
fn immobiliare_search_url_carries_all_filters() {
    let mut filters = SearchFilters::for_location("Milano");
    filters.property_type = Some("appartamento".to_string());
    filters.price_min = Some(100_000.0);
    filters.price_max = Some(250_000.0);
    filters.rooms_min = Some(3);
    filters.sqm_min = Some(80.0);

    let url = ImmobiliareIt.search_url(&filters, 1);

    assert_eq!(
        url,
        "https://www.immobiliare.it/vendita-case/milano/\
         ?tipoImmobile=appartamento&prezzoMinimo=100000&prezzoMassimo=250000\
         &localiMinimo=3&superficieMinima=80"
    );
}

#[test]
fn immobiliare_search_url_is_bare_without_filters() {
    let filters = SearchFilters::for_location("Roma");
    assert_eq!(
        ImmobiliareIt.search_url(&filters, 1),
        "https://www.immobiliare.it/vendita-case/roma/"
    );
}

#[test]
fn immobiliare_search_url_numbers_later_pages() {
    let filters = SearchFilters::for_location("Roma");
    assert_eq!(
        ImmobiliareIt.search_url(&filters, 3),
        "https://www.immobiliare.it/vendita-case/roma/?pag=3"
    );
}

// --- immobiliare.it cards ---

const IMMOBILIARE_CARD: &str = r#"
<div class="nd-list__item">
    <a class="in-card__title" href="/annunci/12345678.html">Trilocale via Brera 12</a>
    <ul class="nd-list__item-features">
        <li class="nd-list__item-price">€ 1.250.000</li>
        <li>120 m²</li>
        <li>4 locali</li>
        <li>2 bagni</li>
    </ul>
    <div class="in-card__location">Milano, Brera</div>
    <img src="/img/cover.jpg">
</div>
"#;

#[test]
fn immobiliare_parses_a_complete_card() {
    let html = format!("<html><body>{IMMOBILIARE_CARD}</body></html>");

    let listings =
        ImmobiliareIt.parse_search_page(&html, "https://www.immobiliare.it/vendita-case/milano/");

    assert_eq!(listings.len(), 1);
    let listing = &listings[0];
    assert_eq!(listing.source, "immobiliare_it");
    assert_eq!(
        listing.source_url,
        "https://www.immobiliare.it/annunci/12345678.html"
    );
    assert_eq!(listing.listing_id.as_deref(), Some("12345678"));
    assert_eq!(listing.title.as_deref(), Some("Trilocale via Brera 12"));
    assert_eq!(listing.price, Some(1_250_000.0));
    assert_eq!(listing.price_text.as_deref(), Some("€ 1.250.000"));
    assert_eq!(listing.location.as_deref(), Some("Milano, Brera"));
    assert_eq!(listing.sqm, Some(120.0));
    assert_eq!(listing.rooms, Some(4));
    assert_eq!(listing.bathrooms, Some(2));
    assert_eq!(listing.image_url.as_deref(), Some("/img/cover.jpg"));
}

#[test]
fn immobiliare_card_without_link_is_skipped() {
    let html = r#"<html><body>
        <div class="nd-list__item"><span>Annuncio senza link</span></div>
    </body></html>"#;

    let listings = ImmobiliareIt.parse_search_page(html, "https://www.immobiliare.it/");

    assert!(listings.is_empty());
}

#[test]
fn immobiliare_falls_back_to_alternate_card_markup() {
    let html = r#"<html><body>
        <div class="in-card">
            <a href="https://www.immobiliare.it/annunci/555.html">Bilocale</a>
        </div>
    </body></html>"#;

    let listings = ImmobiliareIt.parse_search_page(html, "https://www.immobiliare.it/");

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].listing_id.as_deref(), Some("555"));
}

#[test]
fn immobiliare_has_no_detail_page_parser() {
    let parsed =
        ImmobiliareIt.parse_listing("<html></html>", "https://www.immobiliare.it/annunci/1.html");
    assert!(parsed.is_none());
}

// --- casa.it URLs ---

#[test]
fn casa_search_url_uses_native_contract_paths() {
    let mut filters = SearchFilters::for_location("Roma");
    filters.contract_type = CONTRACT_RENT.to_string();
    filters.price_min = Some(500.0);
    filters.price_max = Some(1_200.0);

    let url = CasaIt.search_url(&filters, 1);

    assert_eq!(url, "https://www.casa.it/affitto/roma?prezzoMin=500&prezzoMax=1200");
}

#[test]
fn casa_search_url_defaults_to_sale() {
    let filters = SearchFilters::for_location("Roma");
    assert_eq!(CasaIt.search_url(&filters, 1), "https://www.casa.it/vendita/roma");
}

#[test]
fn casa_search_url_numbers_later_pages() {
    let filters = SearchFilters::for_location("Roma");
    assert_eq!(
        CasaIt.search_url(&filters, 2),
        "https://www.casa.it/vendita/roma?page=2"
    );
}

// --- casa.it cards ---

const CASA_CARD: &str = r#"
<div class="listing-item">
    <a class="listing-item__link" href="/immobili/98765432/">Vai all'annuncio</a>
    <h3 class="listing-item__title">Attico con terrazzo</h3>
    <span class="listing-item__price">€ 850.000</span>
    <span class="listing-item__location">Roma, Parioli</span>
</div>
"#;

#[test]
fn casa_parses_a_complete_card() {
    let html = format!("<html><body>{CASA_CARD}</body></html>");

    let listings = CasaIt.parse_search_page(&html, "https://www.casa.it/vendita/roma");

    assert_eq!(listings.len(), 1);
    let listing = &listings[0];
    assert_eq!(listing.source, "casa_it");
    assert_eq!(listing.source_url, "https://www.casa.it/immobili/98765432/");
    assert_eq!(listing.listing_id.as_deref(), Some("98765432"));
    assert_eq!(listing.title.as_deref(), Some("Attico con terrazzo"));
    assert_eq!(listing.price, Some(850_000.0));
    assert_eq!(listing.location.as_deref(), Some("Roma, Parioli"));
    assert_eq!(listing.contract_type.as_deref(), Some("vendita"));
}

#[test]
fn casa_rental_card_takes_contract_from_page_url() {
    let html = format!("<html><body>{CASA_CARD}</body></html>");

    let listings = CasaIt.parse_search_page(&html, "https://www.casa.it/affitto/roma");

    assert_eq!(listings[0].contract_type.as_deref(), Some("affitto"));
}

#[test]
fn casa_card_without_stable_id_is_skipped() {
    let html = r#"<html><body>
        <div class="listing-item">
            <a class="listing-item__link" href="/progetti/nuove-costruzioni">Novità</a>
        </div>
    </body></html>"#;

    let listings = CasaIt.parse_search_page(html, "https://www.casa.it/vendita/roma");

    assert!(listings.is_empty());
}

#[test]
fn casa_card_without_link_is_skipped() {
    let html =
        r#"<html><body><div class="listing-item"><h3>Senza link</h3></div></body></html>"#;

    let listings = CasaIt.parse_search_page(html, "https://www.casa.it/vendita/roma");

    assert!(listings.is_empty());
}

#[test]
fn casa_detail_page_parses_description_and_decimal_price() {
    let html = r#"<html><body>
        <h1 class="detail-page__title">Bilocale arredato</h1>
        <div class="detail-page__description">Luminoso bilocale al secondo piano.</div>
        <div class="detail-page__price">€ 1.200,50 / mese</div>
        <div class="detail-page__location">Torino, Crocetta</div>
    </body></html>"#;

    let listing = CasaIt
        .parse_listing(html, "https://www.casa.it/affitto/torino/4433221/")
        .expect("detail page should parse");

    assert_eq!(listing.listing_id.as_deref(), Some("4433221"));
    assert_eq!(listing.title.as_deref(), Some("Bilocale arredato"));
    assert_eq!(
        listing.description.as_deref(),
        Some("Luminoso bilocale al secondo piano.")
    );
    assert_eq!(listing.price, Some(1_200.5));
    assert_eq!(listing.location.as_deref(), Some("Torino, Crocetta"));
    assert_eq!(listing.contract_type.as_deref(), Some("affitto"));
}

#[test]
fn casa_detail_without_numeric_id_is_rejected() {
    let parsed = CasaIt.parse_listing("<html></html>", "https://www.casa.it/affitto/torino");
    assert!(parsed.is_none());
}

// --- registry ---

#[test]
fn scraper_for_resolves_known_portals() {
    for portal in known_portals() {
        let scraper = scraper_for(portal).expect("known portal should resolve");
        assert_eq!(scraper.portal_name(), portal);
    }
}

#[test]
fn scraper_for_rejects_unknown_portal() {
    assert!(scraper_for("idealista_it").is_none());
}

#[test]
fn known_portals_names_both_portals() {
    assert_eq!(known_portals(), ["immobiliare_it", "casa_it"]);
}
