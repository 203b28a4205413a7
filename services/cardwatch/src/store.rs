//! Synchronous key-value persistence for registry state
//!
//! The registry treats the store as a pure mirror: written through on every
//! mutation, read only once at startup. Corrupt or missing data fails soft so
//! callers can fall back to built-in defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key for the serialized card list (JSON array of Card)
pub const CARDS_KEY: &str = "cards";
/// Key for the global refresh interval (stringified integer milliseconds)
pub const REFRESH_INTERVAL_KEY: &str = "refresh_interval";
/// Key for the changed-card-id set (JSON array of ids)
pub const CHANGED_IDS_KEY: &str = "changed_card_ids";

/// Key-value byte storage for registry state
pub trait Store: Send + Sync {
    /// Load the bytes stored under a key, or None when absent or unreadable
    fn load(&self, key: &str) -> Option<Vec<u8>>;

    /// Persist bytes under a key
    fn save(&self, key: &str, bytes: &[u8]) -> crate::Result<()>;
}

/// Store backed by one file per key under a state directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Store for FileStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(key);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("No stored value for '{}' at {:?}: {}", key, path, e);
                None
            }
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> crate::Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            crate::CardwatchError::Storage(format!(
                "Failed to create state directory {:?}: {}",
                self.dir, e
            ))
        })?;
        let path = self.dir.join(key);
        std::fs::write(&path, bytes).map_err(|e| {
            crate::CardwatchError::Storage(format!("Failed to write {:?}: {}", path, e))
        })
    }
}

/// In-memory store for tests and degraded operation without a writable state dir
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> crate::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| crate::CardwatchError::Storage(format!("Store lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(CARDS_KEY, b"[1,2,3]").unwrap();
        assert_eq!(store.load(CARDS_KEY), Some(b"[1,2,3]".to_vec()));
    }

    #[test]
    fn file_store_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.load("missing"), None);
    }

    #[test]
    fn file_store_creates_state_dir_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("state");
        let store = FileStore::new(&nested);

        store.save(REFRESH_INTERVAL_KEY, b"4000").unwrap();
        assert_eq!(store.load(REFRESH_INTERVAL_KEY), Some(b"4000".to_vec()));
    }

    #[test]
    fn file_store_overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(CHANGED_IDS_KEY, b"[\"1\"]").unwrap();
        store.save(CHANGED_IDS_KEY, b"[]").unwrap();
        assert_eq!(store.load(CHANGED_IDS_KEY), Some(b"[]".to_vec()));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load(CARDS_KEY), None);
        store.save(CARDS_KEY, b"{}").unwrap();
        assert_eq!(store.load(CARDS_KEY), Some(b"{}".to_vec()));
    }
}
