use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::disk::FileStore;
use crate::lru_cache::MemoryStore;
use crate::store::ResultStore;
use crate::types::*;

/// Tiered store: an in-memory LRU in front of the durable file store.
///
/// The durable tier is authoritative, and several processes may share it.
/// Values written with a TTL are mirrored into the hot tier for at most
/// `hot_lease_ms` (never past their own deadline). Values without a TTL are
/// write-once markers and are always read from disk, so a delete or rewrite
/// by another process is seen on the next read. Window counters live in the
/// hot tier only.
pub struct TieredStore {
    hot: Arc<MemoryStore>,
    durable: Arc<FileStore>,
    hot_lease: i64,
    stats: Arc<RwLock<StoreStats>>,
}

impl TieredStore {
    pub fn new(config: &StoreConfig) -> StorageResult<Self> {
        let hot = Arc::new(MemoryStore::new(config.hot_capacity));
        let durable = Arc::new(FileStore::new(&config.data_dir)?);
        let stats = Arc::new(RwLock::new(StoreStats::default()));

        let stats_for_cb = stats.clone();
        hot.set_eviction_callback(move |key| {
            tracing::debug!(%key, "evicted from hot tier");
            stats_for_cb.write().evictions += 1;
        });

        Ok(Self {
            hot,
            durable,
            hot_lease: i64::try_from(config.hot_lease_ms).unwrap_or(i64::MAX),
            stats,
        })
    }

    /// Get a value and the tier that served it.
    pub fn get_with_tier(&self, key: &StorageKey) -> StorageResult<Option<(StorageValue, StorageTier)>> {
        if let Some((val, _)) = self.hot.get_entry(key) {
            self.stats.write().hot_hits += 1;
            return Ok(Some((val, StorageTier::Hot)));
        }
        self.stats.write().hot_misses += 1;

        match self.durable.get_entry(key)? {
            Some((val, expires_at)) => {
                let promoted = self.mirror(key.clone(), val.clone(), expires_at);
                let mut stats = self.stats.write();
                stats.durable_hits += 1;
                if promoted {
                    stats.promotions += 1;
                }
                Ok(Some((val, StorageTier::Durable)))
            }
            None => {
                self.stats.write().durable_misses += 1;
                Ok(None)
            }
        }
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = self.stats.read().clone();
        stats.hot_entries = self.hot.len();
        stats
    }

    pub fn hot(&self) -> &MemoryStore {
        &self.hot
    }

    pub fn durable(&self) -> &FileStore {
        &self.durable
    }

    /// Copy a value into the hot tier under the lease. Returns whether it was
    /// cached.
    fn mirror(&self, key: StorageKey, value: StorageValue, expires_at: Option<i64>) -> bool {
        let Some(expires_at) = expires_at else {
            return false;
        };
        if self.hot_lease == 0 {
            return false;
        }
        let lease_end = now_millis().saturating_add(self.hot_lease);
        self.hot.put_entry(key, value, Some(expires_at.min(lease_end)));
        true
    }
}

impl ResultStore for TieredStore {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<StorageValue>> {
        Ok(self.get_with_tier(key)?.map(|(val, _)| val))
    }

    fn set(&self, key: StorageKey, value: StorageValue, ttl: Option<Duration>) -> StorageResult<()> {
        let expires_at = deadline(ttl);
        self.durable.set(key.clone(), value.clone(), ttl)?;
        if !self.mirror(key.clone(), value, expires_at) {
            self.hot.delete(&key)?;
        }
        Ok(())
    }

    fn set_if_not_exists(
        &self,
        key: StorageKey,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        if !self.durable.set_if_not_exists(key.clone(), value.clone(), ttl)? {
            return Ok(false);
        }
        self.mirror(key, value, deadline(ttl));
        Ok(true)
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<bool> {
        let in_hot = self.hot.delete(key)?;
        let in_durable = self.durable.delete(key)?;
        Ok(in_hot || in_durable)
    }

    fn incr_window(&self, key: &StorageKey, window: Duration) -> StorageResult<u64> {
        self.hot.incr_window(key, window)
    }
}
