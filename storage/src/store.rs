use std::sync::Arc;
use std::time::Duration;

use crate::types::*;

/// Key-value store holding cached results and the durable selection marker.
///
/// `set_if_not_exists` must be atomic: of several concurrent callers on the
/// same absent key, exactly one gets `true`.
pub trait ResultStore: Send + Sync {
    /// Read a live (unexpired) value.
    fn get(&self, key: &StorageKey) -> StorageResult<Option<StorageValue>>;

    /// Write a value, replacing any existing one. `None` TTL never expires.
    fn set(&self, key: StorageKey, value: StorageValue, ttl: Option<Duration>) -> StorageResult<()>;

    /// Write a value that expires after `ttl`.
    fn set_with_ttl(&self, key: StorageKey, value: StorageValue, ttl: Duration) -> StorageResult<()> {
        self.set(key, value, Some(ttl))
    }

    /// Write only if no live value exists. Returns whether the write happened.
    fn set_if_not_exists(
        &self,
        key: StorageKey,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;

    /// Remove a value. Returns whether a live value was removed.
    fn delete(&self, key: &StorageKey) -> StorageResult<bool>;

    /// Increment a fixed-window counter. The window starts at the first
    /// increment; the counter resets once it expires. Returns the new count.
    fn incr_window(&self, key: &StorageKey, window: Duration) -> StorageResult<u64>;
}

impl<T: ResultStore + ?Sized> ResultStore for Arc<T> {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<StorageValue>> {
        (**self).get(key)
    }

    fn set(&self, key: StorageKey, value: StorageValue, ttl: Option<Duration>) -> StorageResult<()> {
        (**self).set(key, value, ttl)
    }

    fn set_if_not_exists(
        &self,
        key: StorageKey,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        (**self).set_if_not_exists(key, value, ttl)
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn incr_window(&self, key: &StorageKey, window: Duration) -> StorageResult<u64> {
        (**self).incr_window(key, window)
    }
}

/// Parse a stored counter.
pub(crate) fn parse_counter(key: &StorageKey, value: &StorageValue) -> StorageResult<u64> {
    std::str::from_utf8(value.as_bytes())
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StorageError::NotACounter(key.to_string()))
}
