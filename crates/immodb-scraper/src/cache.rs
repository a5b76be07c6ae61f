//! File-backed cache for fetched page markup.
//!
//! Entries are namespaced per portal and addressed by the SHA-256 of the
//! fetch key (normally the page URL), so keys never influence the on-disk
//! path. Expiry is lazy: an expired entry is deleted when it is next
//! touched, or during an explicit [`PageCache::clear_expired`] sweep.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ScraperError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: String,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Markup cache for one portal namespace.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
    default_ttl_secs: u64,
}

impl PageCache {
    /// Creates a cache rooted at `cache_root/portal`. The directory is
    /// created on first write, not here.
    #[must_use]
    pub fn new(cache_root: &Path, portal: &str, default_ttl_secs: u64) -> Self {
        Self {
            dir: cache_root.join(portal),
            default_ttl_secs,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{digest}.json"))
    }

    /// True if a live entry exists for `key`. An expired entry is removed
    /// and reported as absent.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.read_entry(key).is_some()
    }

    /// Returns the cached value for `key`, or `None` on miss, expiry, or an
    /// unreadable entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_entry(key).map(|entry| entry.value)
    }

    fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "unreadable cache entry");
                return None;
            }
        };
        if entry.expires_at < Utc::now() {
            if let Err(error) = fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), %error, "could not evict expired cache entry");
            }
            return None;
        }
        Some(entry)
    }

    /// Stores `value` under `key`, overwriting any prior entry. `ttl_secs`
    /// falls back to the namespace default when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory or the entry file cannot be
    /// written.
    pub fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), ScraperError> {
        fs::create_dir_all(&self.dir)?;
        let ttl = i64::try_from(ttl_secs.unwrap_or(self.default_ttl_secs)).unwrap_or(i64::MAX);
        let now = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            value: value.to_string(),
            cached_at: now,
            expires_at: now + Duration::seconds(ttl),
        };
        let payload = serde_json::to_string(&entry).map_err(|source| ScraperError::Json {
            context: format!("cache entry for {key}"),
            source,
        })?;
        fs::write(self.entry_path(key), payload)?;
        Ok(())
    }

    /// Removes every entry in this namespace. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be scanned or an entry
    /// cannot be deleted.
    pub fn clear(&self) -> Result<usize, ScraperError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Removes expired and unreadable entries. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be scanned or an entry
    /// cannot be deleted.
    pub fn clear_expired(&self) -> Result<usize, ScraperError> {
        let now = Utc::now();
        let mut removed = 0;
        for path in self.entry_files()? {
            let live = fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str::<CacheEntry>(&raw).ok())
                .is_some_and(|entry| entry.expires_at >= now);
            if !live {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, ScraperError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
