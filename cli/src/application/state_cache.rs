//! Time-boxed memoization of machine state lookups.
//!
//! Expiry is lazy: entries are checked, and dropped, only when read. There is
//! no background eviction and no internal locking; the owner must serialize
//! access (the lifecycle controller takes `&mut self` for every operation).

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

struct Entry<V> {
    value: V,
    captured_at: Instant,
}

/// Cache of values keyed by machine name, each valid for `ttl` after capture.
pub struct StateCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V: Clone> StateCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the value for `key` unless it is missing or older than the TTL.
    /// Expired entries are removed.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => entry.captured_at.elapsed() > self.ttl,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Store `value` under `key`, stamped with the current time.
    pub fn set(&mut self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                captured_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Whether no entries are stored, expired ones included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for StateCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
