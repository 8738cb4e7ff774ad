//! On-disk cache tier backing the in-process store
//!
//! Persists serializable values to JSON files with expiry timestamps so that
//! a restarted process (or a sibling process on the same host) picks up both
//! cached quotes and an active rate-limit window. Expired entries are still
//! readable, flagged via `is_expired`, to support stale-serve degradation.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry<T> {
    /// The cached data
    data: T,
    /// When the data was written
    cached_at: DateTime<Utc>,
    /// When the entry stops being fresh
    expires_at: DateTime<Utc>,
}

/// Result of reading a disk entry, including freshness metadata
#[derive(Debug)]
pub struct DiskRead<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally written
    pub cached_at: DateTime<Utc>,
    /// The entry's original deadline
    pub expires_at: DateTime<Utc>,
    /// Whether the entry has passed its expiry
    pub is_expired: bool,
}

/// Persistent JSON-file cache, one file per key
///
/// Files live in an XDG-compliant cache directory (`~/.cache/quotegate/` on
/// Linux) by default, or any directory handed to [`DiskCache::with_dir`]
/// (tests use a `tempfile::TempDir`). Callers treat every failure here as a
/// cache miss; nothing in this tier is allowed to fail a request.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Creates a DiskCache rooted at the XDG cache directory
    ///
    /// Returns `None` if the platform cannot provide one (e.g., no home
    /// directory), in which case the service runs with the memory tier only.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "quotegate")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a DiskCache rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the path of the file holding `key`
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes `data` under `key` with `expires_at = now + ttl`
    ///
    /// The file is rewritten as a unit, so readers never observe a partially
    /// updated entry for a key.
    pub fn write<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> std::io::Result<()> {
        self.ensure_dir()?;

        let now = Utc::now();
        let entry = DiskEntry {
            data,
            cached_at: now,
            expires_at: now + ttl,
        };

        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(self.entry_path(key), json)
    }

    /// Reads the entry under `key`, expired or not
    ///
    /// Returns `None` if the file is missing or unreadable, including a
    /// parse failure; a corrupt entry is indistinguishable from no entry.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<DiskRead<T>> {
        let content = fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: DiskEntry<T> = serde_json::from_str(&content).ok()?;

        let is_expired = Utc::now() > entry.expires_at;

        Some(DiskRead {
            data: entry.data,
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
            is_expired,
        })
    }

    /// Removes the entry under `key`, if any
    pub fn remove(&self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::thread;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        label: String,
        price: String,
    }

    fn payload(label: &str) -> Payload {
        Payload {
            label: label.to_string(),
            price: "123.45".to_string(),
        }
    }

    fn test_cache() -> (DiskCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = DiskCache::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    #[test]
    fn write_creates_one_file_per_key() {
        let (cache, temp_dir) = test_cache();

        cache
            .write("quote_IBM", &payload("ibm"), Duration::seconds(60))
            .expect("write should succeed");

        assert!(temp_dir.path().join("quote_IBM.json").exists());
    }

    #[test]
    fn read_missing_key_returns_none() {
        let (cache, _temp_dir) = test_cache();

        let result: Option<DiskRead<Payload>> = cache.read("never_written");

        assert!(result.is_none());
    }

    #[test]
    fn fresh_entry_reads_back_unexpired() {
        let (cache, _temp_dir) = test_cache();
        let data = payload("fresh");

        cache
            .write("quote_IBM", &data, Duration::seconds(60))
            .expect("write should succeed");

        let read: DiskRead<Payload> = cache.read("quote_IBM").expect("entry should exist");
        assert_eq!(read.data, data);
        assert!(!read.is_expired);
    }

    #[test]
    fn expired_entry_is_still_returned_with_flag() {
        let (cache, _temp_dir) = test_cache();
        let data = payload("old");

        cache
            .write("quote_IBM", &data, Duration::zero())
            .expect("write should succeed");
        thread::sleep(StdDuration::from_millis(10));

        let read: DiskRead<Payload> = cache.read("quote_IBM").expect("entry should exist");
        assert_eq!(read.data, data);
        assert!(read.is_expired);
    }

    #[test]
    fn overwrite_replaces_entry_as_a_unit() {
        let (cache, _temp_dir) = test_cache();

        cache
            .write("quote_IBM", &payload("first"), Duration::seconds(60))
            .expect("first write should succeed");
        cache
            .write("quote_IBM", &payload("second"), Duration::seconds(60))
            .expect("second write should succeed");

        let read: DiskRead<Payload> = cache.read("quote_IBM").expect("entry should exist");
        assert_eq!(read.data.label, "second");
    }

    #[test]
    fn remove_deletes_entry_and_tolerates_absence() {
        let (cache, _temp_dir) = test_cache();

        cache
            .write("quote_IBM", &payload("gone"), Duration::seconds(60))
            .expect("write should succeed");
        cache.remove("quote_IBM").expect("remove should succeed");

        let read: Option<DiskRead<Payload>> = cache.read("quote_IBM");
        assert!(read.is_none());

        // Removing a key that was never written is not an error.
        cache.remove("quote_IBM").expect("second remove should succeed");
    }

    #[test]
    fn corrupt_entry_reads_as_missing() {
        let (cache, temp_dir) = test_cache();

        fs::create_dir_all(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("quote_IBM.json"), "{ not json").unwrap();

        let read: Option<DiskRead<Payload>> = cache.read("quote_IBM");
        assert!(read.is_none());
    }

    #[test]
    fn cached_at_is_recorded_at_write_time() {
        let (cache, _temp_dir) = test_cache();

        let before = Utc::now();
        cache
            .write("quote_IBM", &payload("stamped"), Duration::seconds(60))
            .expect("write should succeed");
        let after = Utc::now();

        let read: DiskRead<Payload> = cache.read("quote_IBM").expect("entry should exist");
        assert!(read.cached_at >= before);
        assert!(read.cached_at <= after);
    }

    #[test]
    fn write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("deeper").join("cache");
        let cache = DiskCache::with_dir(nested.clone());

        cache
            .write("quote_IBM", &payload("nested"), Duration::seconds(60))
            .expect("write should succeed");

        assert!(nested.join("quote_IBM.json").exists());
    }

    #[test]
    fn default_path_contains_project_name() {
        if let Some(cache) = DiskCache::new() {
            let path_str = cache.cache_dir.to_string_lossy();
            assert!(path_str.contains("quotegate"));
        }
        // Passes if new() returns None (e.g., no home directory in CI).
    }
}
