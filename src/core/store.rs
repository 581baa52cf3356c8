//! Persistent state store.
//!
//! Wraps a host key-value [`Storage`] and keeps the whole [`ApplicationState`]
//! under a single key. Every successful save fans the new state out to all
//! broadcast subscribers, which is how UI views stay in sync.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::constants;
use crate::state::ApplicationState;

/// Capacity of the state broadcast channel. Slow receivers skip to the newest state.
const BROADCAST_CAPACITY: usize = 16;

/// Failures of the host storage. Never surfaced to callers of the store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage document root is not an object")]
    NotAnObject,
}

/// Host key-value storage.
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    /// Stores `value` under `key`. Must not leave a partial write behind on failure.
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Key-value storage backed by one JSON document on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates storage at `<dir>/storage.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(constants::STORAGE_FILE_NAME),
        }
    }

    fn read_document(&self) -> Result<BTreeMap<String, Value>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(StorageError::NotAnObject),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        let content = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename keeps the previous document intact if the write fails.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Loads and saves the application state and broadcasts every saved state.
#[derive(Clone)]
pub struct StateStore {
    storage: Arc<dyn Storage>,
    updates: broadcast::Sender<ApplicationState>,
}

impl StateStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { storage, updates }
    }

    /// Returns the last saved state merged over defaults.
    ///
    /// Storage or decoding errors are logged and yield the default state.
    pub fn load(&self) -> ApplicationState {
        let value = match self.storage.get(constants::PROXY_STORAGE_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return ApplicationState::default(),
            Err(e) => {
                log::error!("[store] Failed to load state: {e}");
                return ApplicationState::default();
            }
        };

        let mut state = match serde_json::from_value::<ApplicationState>(value) {
            Ok(state) => state,
            Err(e) => {
                log::error!("[store] Stored state is unreadable, using defaults: {e}");
                return ApplicationState::default();
            }
        };

        for repair in state.repair() {
            log::warn!("[store] Repaired stored state: {repair}");
        }
        state
    }

    /// Persists `state` and notifies subscribers.
    ///
    /// Returns `false` (after logging) when the storage rejects the write; the
    /// previously persisted value is left as it was.
    pub fn save(&self, state: &ApplicationState) -> bool {
        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                log::error!("[store] Failed to encode state: {e}");
                return false;
            }
        };

        if let Err(e) = self.storage.set(constants::PROXY_STORAGE_KEY, value) {
            log::error!("[store] Failed to save state: {e}");
            return false;
        }

        // No receivers is fine: nobody is listening yet.
        let _ = self.updates.send(state.clone());
        true
    }

    /// Subscribes to states saved from now on.
    #[cfg(test)]
    pub fn subscribe(&self) -> broadcast::Receiver<ApplicationState> {
        self.updates.subscribe()
    }

    /// Sender side of the broadcast, for handles that subscribe later.
    pub fn broadcaster(&self) -> broadcast::Sender<ApplicationState> {
        self.updates.clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Storage, StorageError};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory storage that can be told to reject writes.
    #[derive(Default)]
    pub struct MemoryStorage {
        values: Mutex<HashMap<String, Value>>,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl MemoryStorage {
        pub fn with_value(key: &str, value: Value) -> Self {
            let storage = Self::default();
            storage
                .values
                .lock()
                .unwrap()
                .insert(key.to_string(), value);
            storage
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn raw(&self, key: &str) -> Option<Value> {
            self.values.lock().unwrap().get(key).cloned()
        }
    }

    impl Storage for MemoryStorage {
        fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::NotAnObject);
            }
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.values.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }
}
