//! Global upstream rate-limit window
//!
//! The upstream API enforces one quota across every symbol, so rate-limit
//! state is a single shared "blocked until" timestamp, not a per-key value.
//! While the window is active the service never calls upstream; it serves
//! stale data or a degraded error instead.
//!
//! The deadline lives in memory and is mirrored best-effort through the same
//! disk tier as the quote cache, so a restarted or sibling process on the
//! host starts inside an already-active window instead of burning quota to
//! rediscover it. Mirror failures degrade to "not limited", never to an
//! error.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::cache::DiskCache;

/// Disk-mirror key for the shared window deadline
const RATE_LIMIT_KEY: &str = "rate_limit";

/// Tracks the shared interval during which no upstream calls are attempted
pub struct RateLimiter {
    blocked_until: Mutex<Option<DateTime<Utc>>>,
    disk: Option<DiskCache>,
}

impl RateLimiter {
    /// Creates a limiter, hydrating from the disk mirror when one is given
    ///
    /// Hydration is the resync point for out-of-process state: a window
    /// recorded by a previous or sibling process is picked up here. A window
    /// tripped elsewhere after construction goes unseen until this process
    /// is throttled itself; the duplicate upstream call that allows is
    /// wasteful but not incorrect.
    pub fn new(disk: Option<DiskCache>) -> Self {
        let initial = disk.as_ref().and_then(read_active_deadline);
        Self {
            blocked_until: Mutex::new(initial),
            disk,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        // The slot is a plain timestamp; a poisoned lock is still readable.
        self.blocked_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a throttle signal: block upstream calls for `cooldown`
    ///
    /// The deadline only ever moves forward. If a window is already active,
    /// a later signal may extend it but can never shorten it; the effective
    /// deadline is returned.
    pub fn mark_limited(&self, cooldown: Duration) -> DateTime<Utc> {
        let candidate = Utc::now() + cooldown;
        let effective = {
            let mut slot = self.lock();
            let effective = match *slot {
                Some(existing) if existing >= candidate => existing,
                _ => candidate,
            };
            *slot = Some(effective);
            effective
        };

        if let Some(disk) = &self.disk {
            let remaining = effective - Utc::now();
            if let Err(e) = disk.write(RATE_LIMIT_KEY, &effective, remaining) {
                debug!(error = %e, "rate limit mirror write failed");
            }
        }

        effective
    }

    /// True iff the current time is before the recorded deadline
    ///
    /// A passed deadline is cleared on the way out (memory and mirror), so
    /// subsequent checks answer without a clock comparison.
    pub fn is_limited(&self) -> bool {
        let now = Utc::now();
        let expired = {
            let mut slot = self.lock();
            match *slot {
                Some(deadline) if now < deadline => return true,
                Some(_) => {
                    *slot = None;
                    true
                }
                None => false,
            }
        };

        if expired {
            self.clear_mirror();
        }
        false
    }

    /// Administrative override: drop the window unconditionally
    ///
    /// Returns the deadline that was cleared, if one was active. Used for
    /// manual recovery from a false-positive throttle signal.
    pub fn reset(&self) -> Option<DateTime<Utc>> {
        let cleared = self.lock().take();
        self.clear_mirror();
        cleared
    }

    /// The recorded deadline, if any
    ///
    /// May return an already-passed deadline if nothing has checked
    /// [`is_limited`](Self::is_limited) since it lapsed.
    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        *self.lock()
    }

    fn clear_mirror(&self) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(RATE_LIMIT_KEY) {
                debug!(error = %e, "rate limit mirror remove failed");
            }
        }
    }
}

/// Reads a still-active deadline from the mirror, if one exists
fn read_active_deadline(disk: &DiskCache) -> Option<DateTime<Utc>> {
    let read = disk.read::<DateTime<Utc>>(RATE_LIMIT_KEY)?;
    if read.is_expired {
        return None;
    }
    Some(read.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    #[test]
    fn not_limited_initially() {
        let limiter = RateLimiter::new(None);
        assert!(!limiter.is_limited());
        assert!(limiter.blocked_until().is_none());
    }

    #[test]
    fn mark_limited_blocks_until_deadline() {
        let limiter = RateLimiter::new(None);
        let deadline = limiter.mark_limited(Duration::seconds(60));

        assert!(limiter.is_limited());
        assert_eq!(limiter.blocked_until(), Some(deadline));
        assert!(deadline > Utc::now());
    }

    #[test]
    fn deadline_never_moves_earlier() {
        let limiter = RateLimiter::new(None);
        let first = limiter.mark_limited(Duration::seconds(60));
        let second = limiter.mark_limited(Duration::seconds(1));

        assert_eq!(second, first);
        assert_eq!(limiter.blocked_until(), Some(first));
    }

    #[test]
    fn later_signal_may_extend_the_window() {
        let limiter = RateLimiter::new(None);
        let first = limiter.mark_limited(Duration::seconds(1));
        let second = limiter.mark_limited(Duration::seconds(60));

        assert!(second > first);
        assert_eq!(limiter.blocked_until(), Some(second));
    }

    #[test]
    fn passed_deadline_clears_lazily() {
        let limiter = RateLimiter::new(None);
        limiter.mark_limited(Duration::zero());
        thread::sleep(StdDuration::from_millis(10));

        assert!(!limiter.is_limited());
        // The check dropped the stale deadline.
        assert!(limiter.blocked_until().is_none());
    }

    #[test]
    fn reset_clears_an_active_window() {
        let limiter = RateLimiter::new(None);
        let deadline = limiter.mark_limited(Duration::seconds(60));

        assert_eq!(limiter.reset(), Some(deadline));
        assert!(!limiter.is_limited());
        assert!(limiter.blocked_until().is_none());
    }

    #[test]
    fn reset_without_a_window_is_a_noop() {
        let limiter = RateLimiter::new(None);
        assert_eq!(limiter.reset(), None);
    }

    #[test]
    fn sibling_process_hydrates_an_active_window() {
        let temp_dir = TempDir::new().unwrap();
        let disk = DiskCache::with_dir(temp_dir.path().to_path_buf());

        let first = RateLimiter::new(Some(disk.clone()));
        let deadline = first.mark_limited(Duration::seconds(60));

        let sibling = RateLimiter::new(Some(disk));
        assert!(sibling.is_limited());
        assert_eq!(sibling.blocked_until(), Some(deadline));
    }

    #[test]
    fn expired_mirror_entry_is_ignored_on_hydration() {
        let temp_dir = TempDir::new().unwrap();
        let disk = DiskCache::with_dir(temp_dir.path().to_path_buf());

        let first = RateLimiter::new(Some(disk.clone()));
        first.mark_limited(Duration::zero());
        thread::sleep(StdDuration::from_millis(10));

        let sibling = RateLimiter::new(Some(disk));
        assert!(!sibling.is_limited());
    }

    #[test]
    fn reset_clears_the_mirror_for_future_processes() {
        let temp_dir = TempDir::new().unwrap();
        let disk = DiskCache::with_dir(temp_dir.path().to_path_buf());

        let first = RateLimiter::new(Some(disk.clone()));
        first.mark_limited(Duration::seconds(60));
        first.reset();

        let sibling = RateLimiter::new(Some(disk));
        assert!(!sibling.is_limited());
    }
}
