use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub rate_limit_rps: f64,
    pub rate_limit_burst: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub browser_headless: bool,
    pub browser_nav_timeout_secs: u64,
    pub browser_user_agent: String,
    pub scraper_content_timeout_secs: u64,
    pub scraper_inter_page_delay_ms: u64,
    pub scraper_max_pages_per_search: u32,
    pub scraper_max_listings_per_run: usize,
    pub session_expires_days: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("browser_headless", &self.browser_headless)
            .field("browser_nav_timeout_secs", &self.browser_nav_timeout_secs)
            .field("browser_user_agent", &self.browser_user_agent)
            .field(
                "scraper_content_timeout_secs",
                &self.scraper_content_timeout_secs,
            )
            .field(
                "scraper_inter_page_delay_ms",
                &self.scraper_inter_page_delay_ms,
            )
            .field(
                "scraper_max_pages_per_search",
                &self.scraper_max_pages_per_search,
            )
            .field(
                "scraper_max_listings_per_run",
                &self.scraper_max_listings_per_run,
            )
            .field("session_expires_days", &self.session_expires_days)
            .finish()
    }
}
