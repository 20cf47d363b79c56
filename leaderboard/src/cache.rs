use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Persisted record: the payload plus the epoch milliseconds it was written at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    /// An entry exactly `max_age_ms` old is already expired.
    pub fn is_fresh(&self, max_age_ms: i64, now_ms: i64) -> bool {
        self.age_ms(now_ms) < max_age_ms
    }

    pub fn written_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Write aside and rename so readers never observe a half-written entry
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keyed cache of the last good results.
///
/// Writes go to the persistent storage until it fails once; from then on the
/// store keeps everything in memory for the rest of the process.
pub struct CacheStore {
    persistent: Option<Box<dyn Storage>>,
    memory: MemoryStorage,
    degraded: AtomicBool,
}

impl CacheStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            persistent: Some(Box::new(storage)),
            memory: MemoryStorage::default(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            persistent: None,
            memory: MemoryStorage::default(),
            degraded: AtomicBool::new(true),
        }
    }

    /// File-backed store, or an in-memory one if the directory can't be created.
    pub fn open(dir: &Path) -> Self {
        match FileStorage::new(dir) {
            Ok(storage) => Self::new(storage),
            Err(e) => {
                warn!(
                    "Cache directory {} is unavailable, keeping cache in memory: {e}",
                    dir.display()
                );
                Self::in_memory()
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn storage(&self) -> &dyn Storage {
        match &self.persistent {
            Some(storage) if !self.is_degraded() => storage.as_ref(),
            _ => &self.memory,
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, payload: &T) {
        self.save_at(key, payload, now_ms())
    }

    pub fn save_at<T: Serialize>(&self, key: &str, payload: &T, timestamp: i64) {
        let value = match serde_json::to_string(&CacheEntry { payload, timestamp }) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode cache entry {key}: {e}");
                return;
            }
        };

        if let Err(e) = self.storage().set(key, &value) {
            if self.degraded.swap(true, Ordering::Relaxed) {
                warn!("Failed to write cache entry {key}: {e}");
                return;
            }
            warn!("Persistent cache failed, switching to memory for this session: {e}");
            if let Err(e) = self.memory.set(key, &value) {
                warn!("Failed to write cache entry {key}: {e}");
            }
        } else {
            debug!("Cached {key} at {timestamp}");
        }
    }

    /// Entry of any age. Missing or unreadable entries are a miss.
    pub fn load_stale<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let value = match self.storage().get(key) {
            Ok(value) => value?,
            Err(e) => {
                warn!("Failed to read cache entry {key}: {e}");
                return None;
            }
        };

        serde_json::from_str(&value)
            .map_err(|e| warn!("Discarding corrupt cache entry {key}: {e}"))
            .ok()
    }

    pub fn load_entry<T: DeserializeOwned>(
        &self,
        key: &str,
        max_age_ms: i64,
        now_ms: i64,
    ) -> Option<CacheEntry<T>> {
        self.load_stale(key)
            .filter(|entry| entry.is_fresh(max_age_ms, now_ms))
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, max_age_ms: i64) -> Option<T> {
        self.load_entry(key, max_age_ms, now_ms())
            .map(|entry| entry.payload)
    }
}
