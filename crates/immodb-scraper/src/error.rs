use immodb_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("could not assemble browser command for {context}: {reason}")]
    Command { context: String, reason: String },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out after {timeout_secs}s waiting for {what}")]
    Timeout { what: String, timeout_secs: u64 },

    #[error("JSON error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] DbError),
}
