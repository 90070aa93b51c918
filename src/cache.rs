//! Generic expiring cache with an independent TTL per entry.
//!
//! The cache is advisory: absence only means "unknown locally", never "does
//! not exist". Every repository read falls back to the durable store on a
//! miss, and every durable write updates or invalidates the matching entry.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    written_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.written_at) >= self.ttl
    }
}

/// Key/value store where every entry carries its own time-to-live. Per-key
/// operations are atomic; expired entries are removed lazily on access and
/// swept on `has`/`size`.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Look up a live entry, evicting it first if its TTL has run out.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace an entry, resetting its write timestamp.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.sweep_expired();
        self.entries.contains_key(key)
    }

    /// Number of live entries after sweeping expired ones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.sweep_expired();
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}
