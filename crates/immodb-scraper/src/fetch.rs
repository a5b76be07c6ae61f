//! The page-fetch pipeline behind every portal scraper.
//!
//! [`PageFetcher`] is the seam between orchestration and the live browser.
//! Production code uses [`BrowserFetcher`], which runs the full pipeline:
//! cache check, rate-limit wait, session-aware navigation, readiness wait
//! (soft-failing), settle delay, markup capture, cache store. Tests drive
//! the same orchestration with canned fixtures instead.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use immodb_core::AppConfig;
use immodb_db::{invalidate_session, load_session, save_session};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use crate::browser::{BrowserManager, BrowserSettings};
use crate::cache::PageCache;
use crate::error::ScraperError;
use crate::rate_limit::RateLimiter;
use crate::session::SessionState;

const SETTLE_BASE_MS: u64 = 2000;
const SETTLE_JITTER_MS: u64 = 1000;

/// Retrieves rendered markup for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, optionally waiting for `readiness_selector` before
    /// reading the page.
    async fn fetch(&self, url: &str, readiness_selector: Option<&str>)
        -> Result<String, ScraperError>;

    /// Persists or invalidates the browser identity after an authentication
    /// probe. Fetchers without a session store ignore this.
    async fn record_auth_outcome(&self, authenticated: bool) -> Result<(), ScraperError> {
        let _ = authenticated;
        Ok(())
    }
}

/// Browser-backed [`PageFetcher`] bound to one `(profile, portal)` pair.
pub struct BrowserFetcher {
    browser: BrowserManager,
    cache: PageCache,
    limiter: Mutex<RateLimiter>,
    pool: SqlitePool,
    profile_name: String,
    portal: String,
    session_expires_days: i64,
    content_timeout: Duration,
    use_cache: bool,
    last_page: Mutex<Option<Page>>,
}

impl BrowserFetcher {
    /// Assembles the retrieval pipeline for one `(profile, portal)` pair.
    ///
    /// Loads any stored session for the pair and starts the browser with it.
    /// A stored session that no longer parses is invalidated and the run
    /// proceeds with a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store is unreachable or the browser
    /// fails to launch.
    pub async fn connect(
        pool: SqlitePool,
        config: &AppConfig,
        portal: &str,
        profile_name: &str,
        requests_per_second: f64,
        use_cache: bool,
    ) -> Result<Self, ScraperError> {
        let session = match load_session(&pool, profile_name, portal).await? {
            Some(row) => match SessionState::from_row(&row) {
                Ok(state) => {
                    tracing::info!(profile = profile_name, portal, "restored stored session");
                    Some(state)
                }
                Err(error) => {
                    tracing::warn!(
                        profile = profile_name,
                        portal,
                        %error,
                        "stored session unreadable; invalidating"
                    );
                    invalidate_session(&pool, profile_name, portal).await?;
                    None
                }
            },
            None => None,
        };

        let browser =
            BrowserManager::start(BrowserSettings::from_app_config(config), session).await?;

        Ok(Self {
            browser,
            cache: PageCache::new(&config.cache_dir, portal, config.cache_ttl_secs),
            limiter: Mutex::new(RateLimiter::new(
                requests_per_second,
                config.rate_limit_burst,
            )),
            pool,
            profile_name: profile_name.to_string(),
            portal: portal.to_string(),
            session_expires_days: config.session_expires_days,
            content_timeout: Duration::from_secs(config.scraper_content_timeout_secs),
            use_cache,
            last_page: Mutex::new(None),
        })
    }

    async fn read_content(&self, page: &Page, url: &str) -> Result<String, ScraperError> {
        match timeout(self.content_timeout, page.content()).await {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(ScraperError::Timeout {
                what: format!("content of {url}"),
                timeout_secs: self.content_timeout.as_secs(),
            }),
        }
    }

    /// Keeps `page` as the most recent page, closing its predecessor. The
    /// trailing page stays open so an authentication probe can capture
    /// session state from it.
    async fn stash_page(&self, page: Page) {
        let mut slot = self.last_page.lock().await;
        if let Some(previous) = slot.replace(page) {
            if let Err(error) = previous.close().await {
                tracing::debug!(%error, "could not close previous page");
            }
        }
    }

    /// Closes the trailing page and shuts the browser down.
    pub async fn close(self) {
        let mut slot = self.last_page.lock().await;
        if let Some(page) = slot.take() {
            if let Err(error) = page.close().await {
                tracing::debug!(%error, "could not close final page");
            }
        }
        drop(slot);
        self.browser.close().await;
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(
        &self,
        url: &str,
        readiness_selector: Option<&str>,
    ) -> Result<String, ScraperError> {
        if self.use_cache {
            if let Some(html) = self.cache.get(url) {
                tracing::debug!(url, "cache hit");
                return Ok(html);
            }
        }

        self.limiter.lock().await.acquire().await;

        let page = self.browser.navigate_with_session(url).await?;

        if let Some(selector) = readiness_selector {
            if let Err(error) = self
                .browser
                .wait_for_selector(&page, selector, self.content_timeout)
                .await
            {
                tracing::warn!(url, %error, "content readiness wait failed; reading page as-is");
            }
        }

        // Let client-side rendering settle, with jitter against a burst
        // signature.
        sleep(Duration::from_millis(
            SETTLE_BASE_MS + rand::random::<u64>() % SETTLE_JITTER_MS,
        ))
        .await;

        let html = match self.read_content(&page, url).await {
            Ok(html) => html,
            Err(error) => {
                if let Err(close_error) = page.close().await {
                    tracing::debug!(error = %close_error, "could not close failed page");
                }
                return Err(error);
            }
        };
        self.stash_page(page).await;

        if self.use_cache {
            if let Err(error) = self.cache.set(url, &html, None) {
                tracing::warn!(url, %error, "could not cache page");
            }
        }
        Ok(html)
    }

    async fn record_auth_outcome(&self, authenticated: bool) -> Result<(), ScraperError> {
        if authenticated {
            let slot = self.last_page.lock().await;
            let Some(page) = slot.as_ref() else {
                tracing::debug!("no page available to capture session from");
                return Ok(());
            };
            let state = self.browser.capture_session(page, true).await?;
            let session = state.to_new_session(&self.profile_name, &self.portal)?;
            let row = save_session(&self.pool, &session, self.session_expires_days).await?;
            tracing::info!(
                profile = %self.profile_name,
                portal = %self.portal,
                success_count = row.success_count,
                "session saved"
            );
        } else {
            let affected = invalidate_session(&self.pool, &self.profile_name, &self.portal).await?;
            tracing::warn!(
                profile = %self.profile_name,
                portal = %self.portal,
                affected,
                "session invalidated after failed authentication check"
            );
        }
        Ok(())
    }
}
