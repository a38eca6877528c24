//! Time-bounded cache for rendered listing contexts.
//!
//! An entry is served unchanged until its TTL runs out, whatever happens to the underlying
//! data in the meantime. The first lookup after expiry drops the entry and the caller
//! recomputes it. Every insert also sweeps out whatever else has expired.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde_json::Value;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        // The read guard must be dropped before `remove` touches the same shard.
        let hit = self.entries.get(key).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        });
        match hit {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let now = Instant::now();
        self.cleanup_expired(now);
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    fn cleanup_expired(&self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired page cache entries");
        }
    }

    /// Returns the live entry for `key`, or runs `compute` and caches its result. Errors are
    /// not cached. Two concurrent misses may both compute; the later insert wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key, "page cache hit");
            return Ok(value);
        }
        tracing::debug!(key, "page cache miss");
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
