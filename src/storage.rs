//! Persisted key-value storage for registration state
//!
//! The coordinator persists three top-level fields: `credentials`,
//! `senderId`, and `persistentIds`. Any durable key-value mechanism works;
//! this module ships a single-document JSON file store plus an in-memory
//! store for hosts that manage durability themselves.

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Common storage operations result type
pub type StoreResult<T> = Result<T, String>;

/// Persisted store keys
pub const KEY_CREDENTIALS: &str = "credentials";
pub const KEY_SENDER_ID: &str = "senderId";
pub const KEY_PERSISTENT_IDS: &str = "persistentIds";
pub const KEY_CREDENTIALS_ROTATED_AT: &str = "credentialsRotatedAt";

/// Capability interface over a durable key-value store.
///
/// Values are JSON; absent keys read back as `None`. The store is trusted to
/// serialize physical writes.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;
    fn set(&self, key: &str, value: serde_json::Value) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Get the global .push-bridge directory in user home
pub fn get_global_bridge_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".push-bridge")
}

/// Ensure a directory exists, creating it if necessary
fn ensure_dir(path: &Path) -> StoreResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {:?}: {}", path, e))?;
    }
    Ok(())
}

/// Write data to a file atomically (temp file + rename)
fn atomic_write(path: &Path, content: &str) -> StoreResult<()> {
    let temp_path = path.with_extension("tmp");

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    // Write to temp file
    fs::write(&temp_path, content)
        .map_err(|e| format!("Failed to write temp file {:?}: {}", temp_path, e))?;

    // Atomic rename
    fs::rename(&temp_path, path)
        .map_err(|e| format!("Failed to rename {:?} to {:?}: {}", temp_path, path, e))?;

    Ok(())
}

/// Single JSON document store, one file per coordinator.
///
/// Writes are read-modify-write under an exclusive file lock so that two
/// processes sharing the same profile cannot interleave updates.
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    /// Create a store at the default global location (~/.push-bridge/store.json)
    pub fn global() -> Self {
        Self::new(get_global_bridge_dir().join("store.json"))
    }

    /// Path to the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<BTreeMap<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read file {:?}: {}", self.path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse JSON from {:?}: {}", self.path, e))
    }

    fn save(&self, data: &BTreeMap<String, serde_json::Value>) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e))?;
        atomic_write(&self.path, &content)
    }

    /// Run a read-modify-write cycle under the exclusive file lock
    fn with_lock<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, serde_json::Value>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        if let Some(parent) = self.lock_path.parent() {
            ensure_dir(parent)?;
        }
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| format!("Failed to open lock file {:?}: {}", self.lock_path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| format!("Failed to lock {:?}: {}", self.lock_path, e))?;

        let result = (|| {
            let mut data = self.load()?;
            let value = f(&mut data)?;
            self.save(&data)?;
            Ok(value)
        })();

        // Lock released on drop as well; unlock explicitly to surface errors
        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            log::warn!("Failed to unlock {:?}: {}", self.lock_path, e);
        }

        result
    }
}

impl ConfigStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        self.with_lock(|data| {
            data.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.with_lock(|data| {
            data.remove(key);
            Ok(())
        })
    }
}

/// In-memory store for tests and hosts that persist elsewhere
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        let data = self
            .data
            .lock()
            .map_err(|e| format!("Store lock error: {}", e))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| format!("Store lock error: {}", e))?;
        data.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| format!("Store lock error: {}", e))?;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store.json"));

        assert_eq!(store.get(KEY_CREDENTIALS).unwrap(), None);
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store.json"));

        store
            .set(KEY_SENDER_ID, serde_json::json!("sender-1"))
            .unwrap();
        assert_eq!(
            store.get(KEY_SENDER_ID).unwrap(),
            Some(serde_json::json!("sender-1"))
        );

        store.remove(KEY_SENDER_ID).unwrap();
        assert_eq!(store.get(KEY_SENDER_ID).unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("a").join("b").join("store.json"));

        store
            .set(KEY_PERSISTENT_IDS, serde_json::json!(["id1"]))
            .unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        {
            let store = FileStore::new(&path);
            store
                .set(KEY_CREDENTIALS, serde_json::json!({"fcm": {"token": "T0"}}))
                .unwrap();
        }

        let store = FileStore::new(&path);
        let credentials = store.get(KEY_CREDENTIALS).unwrap().unwrap();
        assert_eq!(credentials["fcm"]["token"], "T0");
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();

        store.set(KEY_SENDER_ID, serde_json::json!("s")).unwrap();
        assert_eq!(
            store.get(KEY_SENDER_ID).unwrap(),
            Some(serde_json::json!("s"))
        );

        store.remove(KEY_SENDER_ID).unwrap();
        assert_eq!(store.get(KEY_SENDER_ID).unwrap(), None);
    }
}
