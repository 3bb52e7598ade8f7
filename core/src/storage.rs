use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::warn;

/// Shared key-value namespace addressable by both the app process and the
/// widget process. Implementations never raise: a failed read behaves as "no
/// value", a failed write is dropped (the in-memory state keeps the change,
/// a restart would lose it).
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str);
    /// Re-read the backing medium so writes from another process become
    /// visible through this handle.
    fn synchronize(&self);
}

/// File-backed adapter: one JSON object per namespace, rewritten on every
/// write. Two processes opening the same path get last-writer-wins exactly
/// as the contract requires; each holds its own snapshot until it
/// synchronizes.
pub struct SharedDefaults {
    path: PathBuf,
    values: Mutex<HashMap<String, Value>>,
}

impl SharedDefaults {
    /// Opening never fails: an unreadable or corrupt namespace file decodes
    /// to an empty map and the store starts from empty history.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(
                    "failed to create namespace directory {}: {e}",
                    parent.display()
                );
            }
        }
        let values = Self::read_file(path);
        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    fn read_file(path: &Path) -> HashMap<String, Value> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("failed to read namespace {}: {e}", path.display());
                return HashMap::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "corrupt namespace {}, starting from empty history: {e}",
                    path.display()
                );
                HashMap::new()
            }
        }
    }

    fn flush(&self, values: &HashMap<String, Value>) {
        match serde_json::to_vec_pretty(values) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.path, bytes) {
                    warn!("dropped write to namespace {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("dropped write, failed to encode namespace: {e}"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for SharedDefaults {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.lock();
        values.insert(key.to_string(), value);
        self.flush(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.lock();
        if values.remove(key).is_some() {
            self.flush(&values);
        }
    }

    fn synchronize(&self) {
        let fresh = Self::read_file(&self.path);
        *self.lock() = fresh;
    }
}

/// In-memory fake for tests. Share it via `Arc` to give two components one
/// namespace; `synchronize` is a no-op since there is no backing medium.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn synchronize(&self) {}
}
