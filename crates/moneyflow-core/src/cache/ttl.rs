use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    generation: u64,
}

/// Count-bounded LRU cache where every entry expires a fixed time after it
/// was written.
///
/// All operations are synchronous. Time comes from the tokio clock, so a
/// paused test runtime controls expiry.
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: NonZeroUsize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            ttl,
            capacity,
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the value for `key` if it is present and not yet expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.pop(key);
        }
        None
    }

    /// Insert or overwrite `key`, restarting its time-to-live.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().entries.put(key.into(), entry);
    }

    /// Insert only if no `clear()` happened since `generation` was read.
    ///
    /// Returns false when the write was discarded.
    pub fn set_if_generation(&self, key: impl Into<String>, value: V, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        inner.entries.put(key.into(), entry);
        true
    }

    /// Current generation; bumped by every `clear()`.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.generation = inner.generation.wrapping_add(1);
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
