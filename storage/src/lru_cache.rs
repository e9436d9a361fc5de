use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::store::{parse_counter, ResultStore};
use crate::types::*;

#[derive(Clone, Debug)]
struct Entry {
    value: StorageValue,
    expires_at: Option<i64>,
}

type EvictionCallback = Box<dyn Fn(StorageKey) + Send + Sync>;

/// RAM-based LRU cache with per-entry expiry: the hot tier.
///
/// Thread-safe via `parking_lot::RwLock`. Every mutation takes the write lock,
/// so the read-modify-write operations (`set_if_not_exists`, `incr_window`)
/// are atomic within a process. Expired entries are dropped lazily on access.
pub struct MemoryStore {
    inner: RwLock<LruCache<Vec<u8>, Entry>>,
    capacity: usize,
    eviction_callback: RwLock<Option<EvictionCallback>>,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(LruCache::new(cap)),
            capacity: cap.get(),
            eviction_callback: RwLock::new(None),
        }
    }

    /// Register a callback invoked when a live entry is evicted for room.
    pub fn set_eviction_callback<F>(&self, cb: F)
    where
        F: Fn(StorageKey) + Send + Sync + 'static,
    {
        *self.eviction_callback.write() = Some(Box::new(cb));
    }

    /// Live value and its deadline, promoting it to most-recently-used.
    pub fn get_entry(&self, key: &StorageKey) -> Option<(StorageValue, Option<i64>)> {
        let mut cache = self.inner.write();
        Self::live(&mut cache, key).map(|e| (e.value.clone(), e.expires_at))
    }

    /// Insert with an absolute deadline (milliseconds since the epoch).
    pub fn put_entry(&self, key: StorageKey, value: StorageValue, expires_at: Option<i64>) {
        let mut cache = self.inner.write();
        self.insert(&mut cache, key, Entry { value, expires_at });
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn live<'a>(cache: &'a mut LruCache<Vec<u8>, Entry>, key: &StorageKey) -> Option<&'a Entry> {
        let expired = cache.peek(key.as_bytes()).map(|e| is_expired(e.expires_at))?;
        if expired {
            cache.pop(key.as_bytes());
            return None;
        }
        cache.get(key.as_bytes())
    }

    fn insert(&self, cache: &mut LruCache<Vec<u8>, Entry>, key: StorageKey, entry: Entry) {
        if cache.contains(key.as_bytes()) {
            cache.put(key.0, entry);
            return;
        }

        if cache.len() >= self.capacity {
            if let Some((evicted_key, evicted)) = cache.pop_lru() {
                if !is_expired(evicted.expires_at) {
                    let cb = self.eviction_callback.read();
                    if let Some(ref callback) = *cb {
                        callback(StorageKey(evicted_key));
                    }
                }
            }
        }

        cache.put(key.0, entry);
    }
}

impl ResultStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<StorageValue>> {
        Ok(self.get_entry(key).map(|(value, _)| value))
    }

    fn set(&self, key: StorageKey, value: StorageValue, ttl: Option<Duration>) -> StorageResult<()> {
        self.put_entry(key, value, deadline(ttl));
        Ok(())
    }

    fn set_if_not_exists(
        &self,
        key: StorageKey,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        let mut cache = self.inner.write();
        if Self::live(&mut cache, &key).is_some() {
            return Ok(false);
        }
        let expires_at = deadline(ttl);
        self.insert(&mut cache, key, Entry { value, expires_at });
        Ok(true)
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<bool> {
        let removed = self.inner.write().pop(key.as_bytes());
        Ok(removed.is_some_and(|e| !is_expired(e.expires_at)))
    }

    fn incr_window(&self, key: &StorageKey, window: Duration) -> StorageResult<u64> {
        let mut cache = self.inner.write();
        let (count, expires_at) = match Self::live(&mut cache, key) {
            Some(entry) => (parse_counter(key, &entry.value)? + 1, entry.expires_at),
            None => (1, deadline(Some(window))),
        };
        let value = StorageValue::from(count.to_string());
        self.insert(&mut cache, key.clone(), Entry { value, expires_at });
        Ok(count)
    }
}
