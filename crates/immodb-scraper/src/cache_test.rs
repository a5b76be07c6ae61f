use chrono::Duration;
use tempfile::TempDir;

use super::*;

fn cache_in(root: &TempDir) -> PageCache {
    PageCache::new(root.path(), "immobiliare_it", 3600)
}

fn write_expired(cache: &PageCache, key: &str) -> PathBuf {
    let now = Utc::now();
    let entry = CacheEntry {
        key: key.to_string(),
        value: "<html>stale</html>".to_string(),
        cached_at: now - Duration::hours(2),
        expires_at: now - Duration::hours(1),
    };
    let path = cache.entry_path(key);
    fs::create_dir_all(path.parent().expect("entry has a parent dir")).expect("create cache dir");
    fs::write(&path, serde_json::to_string(&entry).expect("serialize entry")).expect("write entry");
    path
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn set_then_get_round_trips() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);

    cache
        .set("https://example.test/page-1", "<html>one</html>", None)
        .expect("set");

    assert_eq!(
        cache.get("https://example.test/page-1").as_deref(),
        Some("<html>one</html>")
    );
}

#[test]
fn get_missing_key_is_none() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);

    assert_eq!(cache.get("https://example.test/absent"), None);
}

#[test]
fn exists_reflects_presence() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);

    assert!(!cache.exists("k"));
    cache.set("k", "v", None).expect("set");
    assert!(cache.exists("k"));
}

#[test]
fn set_overwrites_previous_value() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);

    cache.set("k", "first", None).expect("set");
    cache.set("k", "second", None).expect("set");

    assert_eq!(cache.get("k").as_deref(), Some("second"));
}

// ---------------------------------------------------------------------------
// Expiry and corruption
// ---------------------------------------------------------------------------

#[test]
fn expired_entry_is_a_miss_and_is_evicted() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);
    let path = write_expired(&cache, "k");

    assert_eq!(cache.get("k"), None);
    assert!(!path.exists(), "expired entry should be deleted on read");
}

#[test]
fn corrupt_entry_is_a_miss() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);
    let path = cache.entry_path("k");
    fs::create_dir_all(path.parent().expect("entry has a parent dir")).expect("create cache dir");
    fs::write(&path, "not json at all").expect("write entry");

    assert_eq!(cache.get("k"), None);
}

// ---------------------------------------------------------------------------
// Maintenance sweeps
// ---------------------------------------------------------------------------

#[test]
fn clear_removes_all_entries() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);
    cache.set("a", "1", None).expect("set");
    cache.set("b", "2", None).expect("set");

    let removed = cache.clear().expect("clear");

    assert_eq!(removed, 2);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
}

#[test]
fn clear_on_missing_directory_is_zero() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);

    assert_eq!(cache.clear().expect("clear"), 0);
}

#[test]
fn clear_expired_keeps_live_entries() {
    let root = TempDir::new().expect("tempdir");
    let cache = cache_in(&root);
    cache.set("live", "fresh", None).expect("set");
    write_expired(&cache, "dead");
    let corrupt = cache.dir.join("garbage.json");
    fs::write(&corrupt, "{ truncated").expect("write corrupt entry");

    let removed = cache.clear_expired().expect("clear_expired");

    assert_eq!(removed, 2);
    assert_eq!(cache.get("live").as_deref(), Some("fresh"));
}

// ---------------------------------------------------------------------------
// Namespacing
// ---------------------------------------------------------------------------

#[test]
fn namespaces_are_isolated_per_portal() {
    let root = TempDir::new().expect("tempdir");
    let immobiliare = PageCache::new(root.path(), "immobiliare_it", 3600);
    let casa = PageCache::new(root.path(), "casa_it", 3600);

    immobiliare.set("k", "immobiliare", None).expect("set");

    assert_eq!(casa.get("k"), None);
    assert_eq!(immobiliare.get("k").as_deref(), Some("immobiliare"));
}
