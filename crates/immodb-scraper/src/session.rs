//! Serialized browser identity exchanged with the session store.
//!
//! The `scraping_sessions` table stores cookies and web storage as JSON
//! TEXT. This module is the bridge in both directions: parse a stored row
//! into typed state the browser can replay, and fold captured page state
//! back into a row payload for saving.

use std::collections::HashMap;

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, CookieSameSite};
use immodb_db::{NewSession, SessionRow};
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

/// One cookie as persisted in the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub http_only: Option<bool>,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl StoredCookie {
    /// Captures a live cookie as returned by `Network.getCookies`.
    #[must_use]
    pub fn from_live(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: Some(cookie.domain.clone()),
            path: Some(cookie.path.clone()),
            secure: Some(cookie.secure),
            http_only: Some(cookie.http_only),
            same_site: cookie
                .same_site
                .as_ref()
                .map(|s| same_site_label(s).to_string()),
        }
    }
}

/// Replayable browser identity for one `(profile, portal)` pair.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub cookies: Vec<StoredCookie>,
    pub local_storage: HashMap<String, String>,
    pub session_storage: HashMap<String, String>,
    pub user_agent: Option<String>,
    pub viewport_width: i64,
    pub viewport_height: i64,
    pub is_authenticated: bool,
}

impl SessionState {
    /// Parses the JSON columns of a stored session row.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Json`] if a column does not hold the expected
    /// shape. Callers treat that as "no usable session", not as a fatal
    /// condition.
    pub fn from_row(row: &SessionRow) -> Result<Self, ScraperError> {
        Ok(Self {
            cookies: parse_column(&row.cookies, "cookies", &row.id)?,
            local_storage: parse_column(&row.local_storage, "local_storage", &row.id)?,
            session_storage: parse_column(&row.session_storage, "session_storage", &row.id)?,
            user_agent: row.user_agent.clone(),
            viewport_width: row.viewport_width,
            viewport_height: row.viewport_height,
            is_authenticated: row.is_authenticated,
        })
    }

    /// Folds this state into a payload for the session store.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Json`] if a component cannot be serialized.
    pub fn to_new_session(&self, profile_name: &str, portal: &str) -> Result<NewSession, ScraperError> {
        Ok(NewSession {
            profile_name: profile_name.to_string(),
            portal: portal.to_string(),
            cookies: encode("cookies", &self.cookies)?,
            local_storage: encode("local_storage", &self.local_storage)?,
            session_storage: encode("session_storage", &self.session_storage)?,
            user_agent: self.user_agent.clone(),
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            is_authenticated: self.is_authenticated,
        })
    }

    /// Cookie replay parameters for `Network.setCookies`.
    ///
    /// Stored cookies carry no expiry, so replayed cookies live for the
    /// browser process only. Unknown same-site labels are dropped rather
    /// than guessed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Command`] if a cookie is missing a required
    /// field.
    pub fn cookie_params(&self) -> Result<Vec<CookieParam>, ScraperError> {
        let mut params = Vec::with_capacity(self.cookies.len());
        for cookie in &self.cookies {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone());
            if let Some(domain) = &cookie.domain {
                builder = builder.domain(domain.clone());
            }
            if let Some(path) = &cookie.path {
                builder = builder.path(path.clone());
            }
            if let Some(secure) = cookie.secure {
                builder = builder.secure(secure);
            }
            if let Some(http_only) = cookie.http_only {
                builder = builder.http_only(http_only);
            }
            if let Some(same_site) = cookie.same_site.as_deref().and_then(parse_same_site) {
                builder = builder.same_site(same_site);
            }
            params.push(builder.build().map_err(|reason| ScraperError::Command {
                context: format!("cookie {}", cookie.name),
                reason,
            })?);
        }
        Ok(params)
    }

    /// True when web storage must be injected (which requires a reload).
    #[must_use]
    pub fn has_storage(&self) -> bool {
        !self.local_storage.is_empty() || !self.session_storage.is_empty()
    }

    /// Script seeding web storage for the current origin.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Json`] if a storage map cannot be serialized.
    pub fn storage_inject_script(&self) -> Result<String, ScraperError> {
        let local = encode("local_storage", &self.local_storage)?;
        let session = encode("session_storage", &self.session_storage)?;
        Ok(format!(
            "(() => {{\n\
             const local = {local};\n\
             const session = {session};\n\
             for (const [k, v] of Object.entries(local)) localStorage.setItem(k, v);\n\
             for (const [k, v] of Object.entries(session)) sessionStorage.setItem(k, v);\n\
             }})()"
        ))
    }
}

fn parse_column<T: serde::de::DeserializeOwned>(
    raw: &str,
    column: &str,
    session_id: &str,
) -> Result<T, ScraperError> {
    serde_json::from_str(raw).map_err(|source| ScraperError::Json {
        context: format!("{column} of session {session_id}"),
        source,
    })
}

fn encode<T: Serialize>(what: &str, value: &T) -> Result<String, ScraperError> {
    serde_json::to_string(value).map_err(|source| ScraperError::Json {
        context: what.to_string(),
        source,
    })
}

fn parse_same_site(raw: &str) -> Option<CookieSameSite> {
    match raw {
        "Strict" => Some(CookieSameSite::Strict),
        "Lax" => Some(CookieSameSite::Lax),
        "None" => Some(CookieSameSite::None),
        _ => None,
    }
}

fn same_site_label(same_site: &CookieSameSite) -> &'static str {
    match same_site {
        CookieSameSite::Strict => "Strict",
        CookieSameSite::Lax => "Lax",
        CookieSameSite::None => "None",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row_with(cookies: &str, local: &str, session: &str) -> SessionRow {
        SessionRow {
            id: "session-1".to_string(),
            profile_name: "immobiliare_it_milano".to_string(),
            portal: "immobiliare_it".to_string(),
            cookies: cookies.to_string(),
            local_storage: local.to_string(),
            session_storage: session.to_string(),
            user_agent: Some("test-agent".to_string()),
            viewport_width: 1920,
            viewport_height: 1080,
            is_authenticated: true,
            is_valid: true,
            use_count: 3,
            success_count: 2,
            failure_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn from_row_parses_all_columns() {
        let row = row_with(
            r#"[{"name": "sid", "value": "abc", "domain": ".immobiliare.it", "same_site": "Lax"}]"#,
            r#"{"theme": "dark"}"#,
            r#"{}"#,
        );

        let state = SessionState::from_row(&row).expect("parse session row");

        assert_eq!(state.cookies.len(), 1);
        assert_eq!(state.cookies[0].name, "sid");
        assert_eq!(state.local_storage.get("theme").map(String::as_str), Some("dark"));
        assert!(state.session_storage.is_empty());
        assert!(state.is_authenticated);
    }

    #[test]
    fn from_row_rejects_malformed_cookies() {
        let row = row_with("not json", "{}", "{}");

        let result = SessionState::from_row(&row);

        assert!(
            matches!(result, Err(ScraperError::Json { .. })),
            "expected Json error, got: {result:?}"
        );
    }

    #[test]
    fn round_trip_through_new_session() {
        let row = row_with(
            r#"[{"name": "sid", "value": "abc"}]"#,
            r#"{"k": "v"}"#,
            r#"{}"#,
        );
        let state = SessionState::from_row(&row).expect("parse session row");

        let saved = state
            .to_new_session("immobiliare_it_milano", "immobiliare_it")
            .expect("encode session");

        let reparsed: Vec<StoredCookie> =
            serde_json::from_str(&saved.cookies).expect("cookies stay parseable");
        assert_eq!(reparsed[0].value, "abc");
        assert_eq!(saved.portal, "immobiliare_it");
        assert_eq!(saved.viewport_width, 1920);
    }

    #[test]
    fn cookie_params_map_same_site_and_drop_unknown_labels() {
        let state = SessionState::from_row(&row_with(
            r#"[{"name": "a", "value": "1", "same_site": "Lax"},
                {"name": "b", "value": "2", "same_site": "Whatever"}]"#,
            "{}",
            "{}",
        ))
        .expect("parse session row");

        let params = state.cookie_params().expect("build cookie params");

        assert_eq!(params.len(), 2);
        assert!(matches!(params[0].same_site, Some(CookieSameSite::Lax)));
        assert!(params[1].same_site.is_none());
    }

    #[test]
    fn storage_inject_script_embeds_both_maps() {
        let state = SessionState::from_row(&row_with(
            "[]",
            r#"{"token": "xyz"}"#,
            r#"{"tab": "1"}"#,
        ))
        .expect("parse session row");
        assert!(state.has_storage());

        let script = state.storage_inject_script().expect("build script");

        assert!(script.contains(r#""token":"xyz""#));
        assert!(script.contains("sessionStorage.setItem"));
    }

    #[test]
    fn empty_storage_needs_no_injection() {
        let state = SessionState::from_row(&row_with("[]", "{}", "{}")).expect("parse session row");

        assert!(!state.has_storage());
    }
}
