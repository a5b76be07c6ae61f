//! Chromium lifecycle and session-aware navigation.
//!
//! One [`BrowserManager`] owns one Chromium process for the duration of a
//! job run. Pages are configured through CDP commands before first use:
//! masking script, user-agent and header overrides, device metrics, and
//! timezone. When a stored session is present, its cookies are replayed
//! before navigation and its web storage is injected after the first
//! navigation, followed by one reload. Storage APIs are origin-scoped and
//! unreachable any earlier.

use std::collections::HashMap;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetCookiesParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use immodb_core::AppConfig;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::error::ScraperError;
use crate::session::{SessionState, StoredCookie};
use crate::stealth;

/// Launch settings for the managed browser.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub user_agent: String,
    pub nav_timeout: Duration,
}

impl BrowserSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            headless: config.browser_headless,
            user_agent: config.browser_user_agent.clone(),
            nav_timeout: Duration::from_secs(config.browser_nav_timeout_secs),
        }
    }
}

/// Owns one Chromium process and its CDP event handler.
pub struct BrowserManager {
    browser: Browser,
    handler_task: JoinHandle<()>,
    settings: BrowserSettings,
    session: Option<SessionState>,
}

impl BrowserManager {
    /// Launches Chromium with the anti-automation flags. A restored session,
    /// when present, dictates user agent and viewport for every page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Launch`] if the launch configuration is
    /// rejected and [`ScraperError::Browser`] if the process fails to start.
    pub async fn start(
        settings: BrowserSettings,
        session: Option<SessionState>,
    ) -> Result<Self, ScraperError> {
        let mut builder = BrowserConfig::builder().args(stealth::LAUNCH_ARGS);
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScraperError::Launch)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        // The handler stream must be drained for the CDP connection to make
        // progress; it ends when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            headless = settings.headless,
            restored_session = session.is_some(),
            "browser started"
        );
        Ok(Self {
            browser,
            handler_task,
            settings,
            session,
        })
    }

    fn user_agent(&self) -> &str {
        self.session
            .as_ref()
            .and_then(|state| state.user_agent.as_deref())
            .unwrap_or(&self.settings.user_agent)
    }

    fn viewport(&self) -> (i64, i64) {
        self.session.as_ref().map_or(
            (stealth::VIEWPORT_WIDTH, stealth::VIEWPORT_HEIGHT),
            |state| (state.viewport_width, state.viewport_height),
        )
    }

    /// Opens a blank page with the full fingerprint treatment applied.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if a CDP command fails.
    pub async fn new_page(&self, apply_stealth: bool) -> Result<Page, ScraperError> {
        let page = self.browser.new_page("about:blank").await?;

        if apply_stealth {
            let masking = AddScriptToEvaluateOnNewDocumentParams::builder()
                .source(stealth::MASKING_SCRIPT)
                .build()
                .map_err(|reason| command_error("masking script", reason))?;
            page.execute(masking).await?;
        }

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.user_agent())
            .accept_language(stealth::LOCALE)
            .build()
            .map_err(|reason| command_error("user agent override", reason))?;
        page.execute(user_agent).await?;

        let headers = SetExtraHttpHeadersParams::builder()
            .headers(Headers::new(stealth::extra_headers()))
            .build()
            .map_err(|reason| command_error("extra headers", reason))?;
        page.execute(headers).await?;

        let (width, height) = self.viewport();
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width)
            .height(height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|reason| command_error("device metrics", reason))?;
        page.execute(metrics).await?;

        let timezone = SetTimezoneOverrideParams::builder()
            .timezone_id(stealth::TIMEZONE)
            .build()
            .map_err(|reason| command_error("timezone override", reason))?;
        page.execute(timezone).await?;

        tracing::debug!(stealth = apply_stealth, "page configured");
        Ok(page)
    }

    /// Opens a page, replays stored cookies, navigates, and injects stored
    /// web storage (reloading once so page scripts observe it).
    ///
    /// The page is closed before returning an error; on success the caller
    /// owns it.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Navigation`] or [`ScraperError::Timeout`] for
    /// failed navigation, or [`ScraperError::Browser`] for CDP failures.
    pub async fn navigate_with_session(&self, url: &str) -> Result<Page, ScraperError> {
        let page = self.new_page(true).await?;
        if let Err(error) = self.prepare_and_goto(&page, url).await {
            if let Err(close_error) = page.close().await {
                tracing::debug!(error = %close_error, "could not close failed page");
            }
            return Err(error);
        }
        Ok(page)
    }

    async fn prepare_and_goto(&self, page: &Page, url: &str) -> Result<(), ScraperError> {
        if let Some(state) = &self.session {
            if !state.cookies.is_empty() {
                let cookies = state.cookie_params()?;
                tracing::debug!(count = cookies.len(), "replaying session cookies");
                page.execute(SetCookiesParams { cookies }).await?;
            }
        }

        self.goto(page, url).await?;

        if let Some(state) = &self.session {
            if state.has_storage() {
                page.evaluate(state.storage_inject_script()?).await?;
                self.reload(page, url).await?;
                tracing::debug!("session storage injected");
            }
        }
        Ok(())
    }

    async fn goto(&self, page: &Page, url: &str) -> Result<(), ScraperError> {
        let deadline = self.settings.nav_timeout;
        let outcome = timeout(deadline, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        })
        .await;
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(ScraperError::Navigation {
                url: url.to_string(),
                message: error.to_string(),
            }),
            Err(_) => Err(ScraperError::Timeout {
                what: format!("navigation to {url}"),
                timeout_secs: deadline.as_secs(),
            }),
        }
    }

    async fn reload(&self, page: &Page, url: &str) -> Result<(), ScraperError> {
        let deadline = self.settings.nav_timeout;
        match timeout(deadline, page.reload()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(error)) => Err(ScraperError::Navigation {
                url: url.to_string(),
                message: format!("reload failed: {error}"),
            }),
            Err(_) => Err(ScraperError::Timeout {
                what: format!("reload of {url}"),
                timeout_secs: deadline.as_secs(),
            }),
        }
    }

    /// Polls for `selector` until it appears or `deadline` passes.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Timeout`] if the selector never appears.
    /// Callers treat that as a soft failure and read whatever rendered.
    pub async fn wait_for_selector(
        &self,
        page: &Page,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), ScraperError> {
        let outcome = timeout(deadline, async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                sleep(Duration::from_millis(250)).await;
            }
        })
        .await;
        if outcome.is_err() {
            return Err(ScraperError::Timeout {
                what: format!("selector {selector}"),
                timeout_secs: deadline.as_secs(),
            });
        }
        Ok(())
    }

    /// Snapshots cookies, web storage, and the effective user agent from a
    /// live page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if a CDP call fails or
    /// [`ScraperError::Json`] if a storage snapshot is unreadable.
    pub async fn capture_session(
        &self,
        page: &Page,
        is_authenticated: bool,
    ) -> Result<SessionState, ScraperError> {
        let cookies = page.get_cookies().await?;
        let local_storage = read_storage(page, "localStorage").await?;
        let session_storage = read_storage(page, "sessionStorage").await?;
        let user_agent = page
            .evaluate("navigator.userAgent")
            .await?
            .into_value::<String>()
            .ok()
            .or_else(|| Some(self.user_agent().to_string()));
        let (viewport_width, viewport_height) = self.viewport();

        Ok(SessionState {
            cookies: cookies.iter().map(StoredCookie::from_live).collect(),
            local_storage,
            session_storage,
            user_agent,
            viewport_width,
            viewport_height,
            is_authenticated,
        })
    }

    /// Best-effort ordered teardown: close the browser, reap the process,
    /// stop the event drain. Each step tolerates failure independently.
    pub async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            tracing::warn!(%error, "browser close failed");
        }
        if let Err(error) = self.browser.wait().await {
            tracing::debug!(%error, "browser process wait failed");
        }
        self.handler_task.abort();
        tracing::debug!("browser shut down");
    }
}

async fn read_storage(page: &Page, which: &str) -> Result<HashMap<String, String>, ScraperError> {
    let raw = page
        .evaluate(format!("JSON.stringify(Object.assign({{}}, window.{which}))"))
        .await?
        .into_value::<String>()
        .map_err(|source| ScraperError::Json {
            context: format!("{which} snapshot"),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| ScraperError::Json {
        context: format!("{which} snapshot"),
        source,
    })
}

fn command_error(context: &str, reason: String) -> ScraperError {
    ScraperError::Command {
        context: context.to_string(),
        reason,
    }
}
