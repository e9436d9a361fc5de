use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::store::{parse_counter, ResultStore};
use crate::types::*;

/// On-disk record: hex-encoded value plus optional deadline.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    value: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// File-backed key-value store: the durable tier.
///
/// Each key is SHA-256 hashed and hex-encoded to produce a safe filename,
/// sharded by the first two hex characters. Writes go to a temp file first and
/// are then renamed (overwrite) or hard-linked (create-if-absent) into place,
/// so readers never see a partial record and `set_if_not_exists` is atomic
/// across processes sharing the directory.
pub struct FileStore {
    base_dir: PathBuf,
    counter_lock: Mutex<()>,
    tmp_seq: AtomicU64,
}

impl FileStore {
    /// Open (or create) a store at the given directory.
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let base_dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            counter_lock: Mutex::new(()),
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Live value and its deadline.
    pub fn get_entry(&self, key: &StorageKey) -> StorageResult<Option<(StorageValue, Option<i64>)>> {
        let path = self.key_path(key)?;
        let Some(envelope) = Self::read_envelope(&path)? else {
            return Ok(None);
        };
        if is_expired(envelope.expires_at) {
            Self::remove_path(&path)?;
            return Ok(None);
        }
        let value = hex::decode(&envelope.value)
            .map_err(|e| StorageError::Serialization(format!("{key}: {e}")))?;
        Ok(Some((StorageValue(value), envelope.expires_at)))
    }

    fn read_envelope(path: &Path) -> StorageResult<Option<Envelope>> {
        match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_path(path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the record to a fresh temp file next to its final path.
    fn write_temp(&self, path: &Path, value: &StorageValue, expires_at: Option<i64>) -> StorageResult<PathBuf> {
        let envelope = Envelope {
            value: hex::encode(value.as_bytes()),
            expires_at,
        };
        let data =
            serde_json::to_vec(&envelope).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{seq}", std::process::id()));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(tmp)
    }

    fn write_entry(&self, key: &StorageKey, value: &StorageValue, expires_at: Option<i64>) -> StorageResult<()> {
        let path = self.key_path(key)?;
        let tmp = self.write_temp(&path, value, expires_at)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Link a complete temp file into place only if nothing is there.
    fn create_entry(&self, path: &Path, value: &StorageValue, expires_at: Option<i64>) -> StorageResult<bool> {
        let tmp = self.write_temp(path, value, expires_at)?;
        let linked = fs::hard_link(&tmp, path);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Filesystem path for a key, creating its shard directory.
    fn key_path(&self, key: &StorageKey) -> StorageResult<PathBuf> {
        let hash = Self::hash_key(key);
        let (shard, rest) = hash.split_at(2);
        let shard_dir = self.base_dir.join(shard);
        fs::create_dir_all(&shard_dir)?;
        Ok(shard_dir.join(rest))
    }

    fn hash_key(key: &StorageKey) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl ResultStore for FileStore {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<StorageValue>> {
        Ok(self.get_entry(key)?.map(|(value, _)| value))
    }

    fn set(&self, key: StorageKey, value: StorageValue, ttl: Option<Duration>) -> StorageResult<()> {
        self.write_entry(&key, &value, deadline(ttl))
    }

    fn set_if_not_exists(
        &self,
        key: StorageKey,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        let path = self.key_path(&key)?;
        let expires_at = deadline(ttl);
        if self.create_entry(&path, &value, expires_at)? {
            return Ok(true);
        }

        // Occupied. An expired record does not count; clear it and retry once.
        if self.get_entry(&key)?.is_some() {
            return Ok(false);
        }
        debug!(%key, "replacing expired record");
        self.create_entry(&path, &value, expires_at)
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<bool> {
        let live = self.get_entry(key)?.is_some();
        let path = self.key_path(key)?;
        Ok(Self::remove_path(&path)? && live)
    }

    fn incr_window(&self, key: &StorageKey, window: Duration) -> StorageResult<u64> {
        let _guard = self.counter_lock.lock();
        let (count, expires_at) = match self.get_entry(key)? {
            Some((value, expires_at)) => (parse_counter(key, &value)? + 1, expires_at),
            None => (1, deadline(Some(window))),
        };
        self.write_entry(key, &StorageValue::from(count.to_string()), expires_at)?;
        Ok(count)
    }
}
