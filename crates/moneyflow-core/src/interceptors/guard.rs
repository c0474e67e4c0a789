use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-key async mutexes.
///
/// Holding the guard for a key excludes every other caller of that key
/// without blocking other keys. Waiters are served in arrival order.
/// A key's mutex is dropped from the registry once the last holder or
/// waiter is gone, including waiters whose `acquire` was cancelled.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters
    users: usize,
}

/// Exclusive access to one key; released on drop.
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspend until `key` is free, then hold it until the guard drops.
    pub async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut map = self.map();
            let slot = map.entry(key.to_string()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };
        // Registered before the first await: dropping this future mid-wait
        // still deregisters through the guard's Drop.
        let mut pending = KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: None,
        };
        pending.guard = Some(lock.lock_owned().await);
        pending
    }

    fn release(&self, key: &str) {
        let mut map = self.map();
        if let Some(slot) = map.get_mut(key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                map.remove(key);
            }
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}
