//! TTL memoization for idempotent backend reads.
//!
//! Holds small, read-mostly payloads such as dictionaries and the area
//! tree. Entries carry an absolute expiry and are evicted lazily when a
//! read finds them stale; nothing sweeps in the background.
//!
//! Search, analyze, generate and apply results are never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::config::DEFAULT_CACHE_TTL;
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    expires_at: Instant,
}

/// Key/value cache with per-entry expiry.
pub struct ResponseCache {
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("default_ttl", &self.default_ttl)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Creates a cache on the system clock with a 5 minute default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Creates a cache on the system clock with the given default TTL.
    #[must_use]
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self::with_clock(Arc::new(SystemClock), default_ttl)
    }

    /// Creates a cache on `clock` with the given default TTL.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            clock,
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `value` for the default TTL.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` until `ttl` from now.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            payload: value,
            expires_at: self.clock.now() + ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    /// Returns the value under `key` if it has not expired. An expired
    /// entry is evicted.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                debug!(key, "Cache hit");
                Some(entry.payload.clone())
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a serializable value for the default TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn put<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?);
        Ok(())
    }

    /// Returns the value under `key` decoded as `T`. Entries that no longer
    /// decode are treated as absent.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
