//! Page-cache maintenance commands.
//!
//! The cache lives on disk under the configured cache directory, one
//! subdirectory per portal. These commands never touch the database.

use clap::Subcommand;

use immodb_core::AppConfig;
use immodb_scraper::PageCache;

/// Sub-commands available under `cache`.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Remove every cached page for a portal
    Clear {
        /// Portal namespace to clear
        #[arg(long)]
        portal: String,
    },
    /// Remove expired cached pages
    ClearExpired {
        /// Restrict the sweep to one portal namespace
        #[arg(long)]
        portal: Option<String>,
    },
}

/// Removes every cached page for `portal`, expired or not.
///
/// # Errors
///
/// Returns an error when the cache directory cannot be read or a cache
/// file cannot be removed.
pub(crate) fn run_cache_clear(config: &AppConfig, portal: &str) -> anyhow::Result<()> {
    let cache = PageCache::new(&config.cache_dir, portal, config.cache_ttl_secs);
    let removed = cache.clear()?;
    println!("removed {removed} cached pages for portal {portal}");
    Ok(())
}

/// Removes expired cached pages for one portal, or for every portal
/// namespace found under the cache directory when no portal is given.
///
/// # Errors
///
/// Returns an error when the cache directory cannot be read or a cache
/// file cannot be removed.
pub(crate) fn run_cache_clear_expired(
    config: &AppConfig,
    portal: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(portal) = portal {
        let cache = PageCache::new(&config.cache_dir, portal, config.cache_ttl_secs);
        let removed = cache.clear_expired()?;
        println!("removed {removed} expired pages for portal {portal}");
        return Ok(());
    }

    let entries = match std::fs::read_dir(&config.cache_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            println!("cache directory does not exist; nothing to remove");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    let mut total = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let namespace = entry.file_name();
        let namespace = namespace.to_string_lossy();
        let cache = PageCache::new(&config.cache_dir, &namespace, config.cache_ttl_secs);
        let removed = cache.clear_expired()?;
        if removed > 0 {
            println!("removed {removed} expired pages for portal {namespace}");
        }
        total += removed;
    }
    println!("removed {total} expired pages in total");
    Ok(())
}
