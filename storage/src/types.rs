use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque storage key wrapping a byte vector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(pub Vec<u8>);

impl StorageKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for StorageKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for StorageKey {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Opaque storage value wrapping a byte vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageValue(pub Vec<u8>);

impl StorageValue {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize a value as JSON.
    pub fn to_json<T: Serialize>(value: &T) -> StorageResult<Self> {
        serde_json::to_vec(value)
            .map(Self)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Deserialize the stored JSON.
    pub fn from_json<T: for<'de> Deserialize<'de>>(&self) -> StorageResult<T> {
        serde_json::from_slice(&self.0).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

impl From<&str> for StorageValue {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for StorageValue {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

/// Wall-clock milliseconds since the epoch. Expiry deadlines use this clock
/// in every tier so entries keep their deadline when they move between tiers.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute deadline for a relative TTL.
pub fn deadline(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|t| now_millis().saturating_add(i64::try_from(t.as_millis()).unwrap_or(i64::MAX)))
}

/// Whether a deadline has passed.
pub fn is_expired(expires_at: Option<i64>) -> bool {
    expires_at.is_some_and(|at| at <= now_millis())
}

/// Configuration for the result store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entries in the in-memory tier.
    pub hot_capacity: usize,
    /// Directory of the durable tier.
    pub data_dir: String,
    /// Longest time a value may be served from memory without consulting
    /// the durable tier. Values without a TTL are never held in memory.
    pub hot_lease_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hot_capacity: 1_024,
            data_dir: "/tmp/lucky-data".into(),
            hot_lease_ms: 1_000,
        }
    }
}

/// Which tier served a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageTier {
    /// In-memory LRU.
    Hot,
    /// Files on disk.
    Durable,
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageTier::Hot => write!(f, "Hot"),
            StorageTier::Durable => write!(f, "Durable"),
        }
    }
}

/// Runtime statistics for the tiered store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub hot_entries: usize,
    pub hot_hits: u64,
    pub hot_misses: u64,
    pub durable_hits: u64,
    pub durable_misses: u64,
    pub promotions: u64,
    pub evictions: u64,
}

/// Errors produced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Counter at {0} is not a number")]
    NotACounter(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_from_str() {
        let key = StorageKey::from("hello");
        assert_eq!(key.as_bytes(), b"hello");
        assert_eq!(key.to_string(), "hello");
    }

    #[test]
    fn storage_key_display_hex_for_binary() {
        let key = StorageKey::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(key.to_string(), "0xdeadbeef");
    }

    #[test]
    fn storage_value_len() {
        let val = StorageValue::new(vec![1, 2, 3]);
        assert_eq!(val.len(), 3);
        assert!(!val.is_empty());
    }

    #[test]
    fn json_values() {
        let val = StorageValue::to_json(&vec![1u32, 2, 3]).unwrap();
        let back: Vec<u32> = val.from_json().unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert!(StorageValue::from("not json").from_json::<Vec<u32>>().is_err());
    }

    #[test]
    fn deadlines() {
        assert!(!is_expired(None));
        assert!(!is_expired(deadline(Some(Duration::from_secs(60)))));
        assert!(is_expired(Some(now_millis() - 1)));
    }

    #[test]
    fn default_config_is_sane() {
        let cfg = StoreConfig::default();
        assert!(cfg.hot_capacity > 0);
        assert!(!cfg.data_dir.is_empty());
        assert_eq!(cfg.hot_lease_ms, 1_000);
    }
}
