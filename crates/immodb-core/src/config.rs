use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Desktop Chrome user agent presented when no saved session supplies one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("IMMODB_ENV", "development"));
    let log_level = or_default("IMMODB_LOG_LEVEL", "info");

    let cache_dir = PathBuf::from(or_default("IMMODB_CACHE_DIR", ".cache"));
    let cache_ttl_secs = parse_u64("IMMODB_CACHE_TTL_SECS", "86400")?;

    let rate_limit_rps = parse_f64("IMMODB_RATE_LIMIT_RPS", "1.0")?;
    let rate_limit_burst = parse_usize("IMMODB_RATE_LIMIT_BURST", "5")?;

    let db_max_connections = parse_u32("IMMODB_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("IMMODB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("IMMODB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let browser_headless = parse_bool("IMMODB_BROWSER_HEADLESS", "true")?;
    let browser_nav_timeout_secs = parse_u64("IMMODB_BROWSER_NAV_TIMEOUT_SECS", "30")?;
    let browser_user_agent = or_default("IMMODB_BROWSER_USER_AGENT", DEFAULT_USER_AGENT);

    let scraper_content_timeout_secs = parse_u64("IMMODB_SCRAPER_CONTENT_TIMEOUT_SECS", "15")?;
    let scraper_inter_page_delay_ms = parse_u64("IMMODB_SCRAPER_INTER_PAGE_DELAY_MS", "2000")?;
    let scraper_max_pages_per_search = parse_u32("IMMODB_SCRAPER_MAX_PAGES_PER_SEARCH", "50")?;
    let scraper_max_listings_per_run =
        parse_usize("IMMODB_SCRAPER_MAX_LISTINGS_PER_RUN", "1000")?;

    let session_expires_days = parse_i64("IMMODB_SESSION_EXPIRES_DAYS", "30")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        cache_dir,
        cache_ttl_secs,
        rate_limit_rps,
        rate_limit_burst,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        browser_headless,
        browser_nav_timeout_secs,
        browser_user_agent,
        scraper_content_timeout_secs,
        scraper_inter_page_delay_ms,
        scraper_max_pages_per_search,
        scraper_max_listings_per_run,
        session_expires_days,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
