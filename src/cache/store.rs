//! Two-tier quote store: in-process mirror plus optional disk tier
//!
//! The mirror is a mutex-guarded map and answers almost every read; the disk
//! tier (when configured) lets a restarted or sibling process on the same
//! host reuse cached quotes. Disk problems never surface to callers; they
//! degrade to cache misses.
//!
//! Expiry is enforced lazily at read time. A fresh read of an expired entry
//! drops the entry's deadline so later fresh reads short-circuit without a
//! clock comparison; the value itself survives for stale reads until it is
//! deleted or overwritten.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::cache::disk::DiskCache;
use crate::data::Quote;

/// One cached quote in the mirror
struct StoreEntry {
    quote: Quote,
    /// `None` once the entry has been lazily evicted from the fresh view
    expires_at: Option<DateTime<Utc>>,
}

/// Key/value quote cache with per-entry expiry and stale reads
///
/// Explicitly constructed and owned by the service; handed to request
/// handlers by reference. Every method is atomic at the granularity of one
/// call; concurrent writers to the same key race on last-write-wins, which
/// is fine because values derive from the same idempotent upstream fetch.
pub struct QuoteStore {
    entries: Mutex<HashMap<String, StoreEntry>>,
    disk: Option<DiskCache>,
}

impl QuoteStore {
    /// Creates a store, with a persistent tier if `disk` is provided
    pub fn new(disk: Option<DiskCache>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            disk,
        }
    }

    /// Creates a memory-only store
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoreEntry>> {
        // A poisoned lock only means another thread panicked mid-call; the
        // map holds plain values, so keep serving.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `quote` under `key` with `expires_at = now + ttl`
    ///
    /// Overwrites any prior entry for the key in both tiers. Disk failures
    /// are swallowed: the cache is best-effort.
    pub fn set(&self, key: &str, quote: Quote, ttl: Duration) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.write(key, &quote, ttl) {
                debug!(key, error = %e, "disk cache write failed; memory tier only");
            }
        }

        let expires_at = Utc::now() + ttl;
        self.lock().insert(
            key.to_string(),
            StoreEntry {
                quote,
                expires_at: Some(expires_at),
            },
        );
    }

    /// Fresh read: returns the value only while `now <= expires_at`
    ///
    /// An expired mirror entry is lazily evicted from the fresh view and the
    /// call falls through to the disk tier, where only a still-fresh entry
    /// counts (and repopulates the mirror). Absent and expired are
    /// indistinguishable to callers of this method.
    pub fn get(&self, key: &str) -> Option<Quote> {
        let now = Utc::now();

        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get_mut(key) {
                match entry.expires_at {
                    Some(expires_at) if now <= expires_at => {
                        return Some(entry.quote.clone());
                    }
                    Some(_) => {
                        entry.expires_at = None;
                    }
                    None => {}
                }
            }
        }

        self.fresh_from_disk(key)
    }

    /// Stale read: returns the last-set value regardless of expiry
    ///
    /// Absent only if the key was never set or was explicitly deleted. Used
    /// exclusively as the degraded-mode fallback.
    pub fn get_stale(&self, key: &str) -> Option<Quote> {
        {
            let entries = self.lock();
            if let Some(entry) = entries.get(key) {
                return Some(entry.quote.clone());
            }
        }

        let disk = self.disk.as_ref()?;
        let read = disk.read::<Quote>(key)?;
        let expires_at = (!read.is_expired).then_some(read.expires_at);
        self.lock().insert(
            key.to_string(),
            StoreEntry {
                quote: read.data.clone(),
                expires_at,
            },
        );
        Some(read.data)
    }

    /// Removes the entry for `key` from both tiers unconditionally
    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(key) {
                debug!(key, error = %e, "disk cache remove failed");
            }
        }
    }

    /// Mirror miss path for fresh reads: only a still-fresh disk entry counts
    fn fresh_from_disk(&self, key: &str) -> Option<Quote> {
        let disk = self.disk.as_ref()?;
        let read = disk.read::<Quote>(key)?;
        if read.is_expired {
            return None;
        }

        self.lock().insert(
            key.to_string(),
            StoreEntry {
                quote: read.data.clone(),
                expires_at: Some(read.expires_at),
            },
        );
        Some(read.data)
    }
}
