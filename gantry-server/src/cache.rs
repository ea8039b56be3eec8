//! TTL cache for external probe results
//!
//! External probes (CLI auth checks, hub logins) cost a process spawn plus
//! a network round trip, while their underlying truth changes slowly.
//! This cache memoizes the last *successful* result per key for a bounded
//! window. Failures are never stored, so a failing probe is retried on the
//! very next call instead of poisoning the window.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde_json::Value;

struct CacheEntry {
    value: Value,
    captured_at: Instant,
}

/// TTL-keyed memoization of probe results. Entries are independent per
/// key; there is no cross-key coordination.
pub struct StatusCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value when it is younger than `ttl`, otherwise
    /// invokes `probe`. A successful probe replaces the entry; a failed
    /// probe leaves any prior entry untouched and propagates the error.
    pub async fn get_or_probe<E, F, Fut>(&self, key: &str, ttl: Duration, probe: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.fresh(key, ttl) {
            return Ok(value);
        }

        let value = probe().await?;
        self.entries.write().unwrap().insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                captured_at: Instant::now(),
            },
        );
        Ok(value)
    }

    fn fresh(&self, key: &str, ttl: Duration) -> Option<Value> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        (entry.captured_at.elapsed() < ttl).then(|| entry.value.clone())
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
