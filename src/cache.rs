//! # TTL Cache
//! Key → value store with a fixed time-to-live.
//!
//! Expiry is lazy: an entry older than the TTL is dropped by the first `get`
//! that sees it. There is no background sweep. `clear` drops everything and is
//! used when the location changes (weather/energy keys depend on it).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::clock::SharedClock;
use crate::signal::Signal;

/// Default TTL (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Local>,
}

/// Thread-safe TTL cache. Mutations are serialized by an internal mutex so
/// overlapping refresh cycles cannot interleave a read-evict with a write.
pub struct TtlCache<V> {
    inner: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: chrono::Duration,
    clock: SharedClock,
}

pub type SignalCache = TtlCache<Signal>;

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::MAX);
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.insert(key.into(), entry);
    }

    /// Store `value` only if `keep()` holds, checked under the cache lock.
    ///
    /// A `clear` that follows whatever makes `keep()` false can therefore
    /// never be undone by a write that passed the check earlier.
    pub fn set_if(&self, key: impl Into<String>, value: V, keep: impl FnOnce() -> bool) -> bool {
        let stored_at = self.clock.now();
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        if !keep() {
            return false;
        }
        map.insert(key.into(), CacheEntry { value, stored_at });
        true
    }

    /// Return the value if it is at most `ttl` old; otherwise evict it.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        let entry = map.get(key)?;
        if now - entry.stored_at > self.ttl {
            tracing::debug!(target: "cache", key, "entry expired, evicting");
            map.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn clear(&self) {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        let n = map.len();
        map.clear();
        tracing::debug!(target: "cache", dropped = n, "cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
