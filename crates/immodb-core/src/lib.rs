use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

pub mod app_config;
pub mod config;
pub mod jobs;
pub mod listing;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{JobRequest, JobRequestError, DEFAULT_MAX_PAGES, MAX_PAGES_LIMIT};
pub use listing::{location_slug, RawListing, SearchFilters, CONTRACT_RENT, CONTRACT_SALE};
