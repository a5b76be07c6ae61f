pub mod browser;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod portals;
pub mod rate_limit;
pub mod session;
pub mod stealth;

pub use browser::{BrowserManager, BrowserSettings};
pub use cache::PageCache;
pub use error::ScraperError;
pub use fetch::{BrowserFetcher, PageFetcher};
pub use portals::{known_portals, scraper_for, PortalScraper, ScrapeLimits, ScrapeOutcome};
pub use rate_limit::RateLimiter;
pub use session::{SessionState, StoredCookie};
