//! In-memory cache of resumable upload session URLs.
//!
//! Remembering the session location returned by a prior create call lets a
//! retried upload skip the create round-trip entirely. Entries use sliding
//! expiration: every successful read pushes the expiry out by the entry's
//! TTL. Expired entries are dropped lazily on read and swept opportunistically
//! on every write rather than by a background task.
//!
//! The cache is owned by a [`crate::StorageClient`] instance; callers sharing
//! a client share entries by key, so keys should include bucket and object
//! path to avoid collisions between unrelated uploads.

use crate::error::StorageError;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// TTL applied when a caller passes a zero duration.
const MIN_TTL_FALLBACK: Duration = Duration::from_secs(5 * 60);

/// Default TTL for new entries until [`UploadUrlCache::set_default_ttl`] is
/// called.
const INITIAL_DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct CacheEntry {
    url: String,
    expires_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(url: String, ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { MIN_TTL_FALLBACK } else { ttl };
        Self {
            url,
            expires_at: Instant::now() + ttl,
            ttl,
        }
    }

    fn touch(&mut self) {
        self.expires_at = Instant::now() + self.ttl;
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe map from caller-supplied key to resumable upload session URL,
/// with sliding expiration.
///
/// All operations are safe under unlimited concurrent callers; the map
/// provides per-key atomicity and the eviction sweep tolerates concurrent
/// mutation.
pub struct UploadUrlCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: RwLock<Duration>,
}

impl Default for UploadUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadUrlCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl: RwLock::new(INITIAL_DEFAULT_TTL),
        }
    }

    /// Set the TTL used for entries inserted without an explicit TTL.
    ///
    /// A zero duration is substituted with a 5-minute floor, not rejected.
    pub fn set_default_ttl(&self, ttl: Duration) {
        let ttl = if ttl.is_zero() { MIN_TTL_FALLBACK } else { ttl };
        *self.default_ttl.write() = ttl;
    }

    /// Insert or replace the session URL for `key`.
    ///
    /// Fails with [`StorageError::InvalidArgument`] when `key` or `url` is
    /// empty or whitespace. Triggers an opportunistic full-scan eviction of
    /// expired entries.
    pub fn set(&self, key: &str, url: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::InvalidArgument("key must be provided".into()));
        }
        if url.trim().is_empty() {
            return Err(StorageError::InvalidArgument("url must be provided".into()));
        }

        let effective_ttl = match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => *self.default_ttl.read(),
        };

        self.entries
            .insert(key.to_string(), CacheEntry::new(url.to_string(), effective_ttl));

        self.evict_expired();
        Ok(())
    }

    /// Look up the session URL for `key`, sliding its expiration on a hit.
    ///
    /// Empty or whitespace keys yield `None` without error. An expired entry
    /// is removed and reported as a miss.
    pub fn try_get(&self, key: &str) -> Option<String> {
        if key.trim().is_empty() {
            return None;
        }

        {
            let mut entry = self.entries.get_mut(key)?;
            if !entry.is_expired() {
                entry.touch();
                return Some(entry.url.clone());
            }
        }

        // Lazy expiry: the guard must be dropped before removal.
        self.entries.remove(key);
        None
    }

    /// Remove the entry for `key`. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        self.entries.remove(key).is_some()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Current entry count. Diagnostic only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }
}
