//! Local key-value persistence for accounts and the session profile
//!
//! Values are JSON strings under flat string keys. [`MemoryStore`] keeps
//! them in a map; [`JsonFileStore`] mirrors the map into one JSON file after
//! every write.

use crate::errors::{HeyBetResult, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> HeyBetResult<Option<String>>;

    fn set(&mut self, key: &str, value: String) -> HeyBetResult<()>;

    fn remove(&mut self, key: &str) -> HeyBetResult<()>;
}

/// Decode the JSON value under `key`, `None` when the key is absent
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> HeyBetResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    let value = serde_json::from_str(&raw).map_err(|e| StorageError::CorruptedData {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    Ok(Some(value))
}

pub fn store_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> HeyBetResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to encode {}: {}", key, e)))?;
    store.set(key, raw)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> HeyBetResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> HeyBetResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> HeyBetResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> HeyBetResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| StorageError::ReadFailed(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&content).map_err(|e| StorageError::CorruptedData {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> HeyBetResult<()> {
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> HeyBetResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> HeyBetResult<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> HeyBetResult<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HeyBetError;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store_json(&mut store, "numbers", &vec![1, 2, 3]).unwrap();

        let loaded: Option<Vec<u32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        store.remove("numbers").unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, "numbers").unwrap(), None);
    }

    #[test]
    fn test_corrupt_value_is_reported_with_key() {
        let mut store = MemoryStore::new();
        store.set("heybet_user", "{not json".to_string()).unwrap();

        match load_json::<Vec<u32>>(&store, "heybet_user") {
            Err(HeyBetError::Storage(StorageError::CorruptedData { key, .. })) => {
                assert_eq!(key, "heybet_user")
            }
            other => panic!("expected corrupted data, got {:?}", other),
        }
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("greeting", "\"ola\"".to_string()).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("greeting").unwrap().as_deref(), Some("\"ola\""));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_unreadable_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(HeyBetError::Storage(StorageError::CorruptedData { .. }))
        ));
    }
}
