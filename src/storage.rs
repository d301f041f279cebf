//! String-keyed blob store. Every persisted piece of state (counter, brand
//! settings, draft snapshot) lives under its own fixed key and is overwritten
//! wholesale. There is no locking: two sessions writing the same key race and
//! the last write wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub const COUNTER_KEY: &str = "inv_counter";
pub const SETTINGS_KEY: &str = "invoice_settings";
pub const DRAFT_KEY: &str = "invoice_data";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of reading a persisted blob whose parse failure is recovered, not raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Absent,
    Corrupt,
    Found(T),
}

impl<T> Loaded<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Loaded::Found(v) => Some(v),
            _ => None,
        }
    }
}

pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One file per key under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

fn io_err(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(io_err(key))?;
        fs::write(self.path_for(key), value).map_err(io_err(key))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key)(e)),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store"));

        assert_eq!(store.get(DRAFT_KEY).unwrap(), None);
        store.set(DRAFT_KEY, "{\"a\":1}").unwrap();
        assert_eq!(store.get(DRAFT_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("store/invoice_data.json").exists());

        store.remove(DRAFT_KEY).unwrap();
        store.remove(DRAFT_KEY).unwrap();
        assert_eq!(store.get(DRAFT_KEY).unwrap(), None);
    }

    #[test]
    fn memory_store_overwrites_wholesale() {
        let store = MemoryStore::new();
        store.set(COUNTER_KEY, "303").unwrap();
        store.set(COUNTER_KEY, "304").unwrap();
        assert_eq!(store.get(COUNTER_KEY).unwrap().as_deref(), Some("304"));
    }
}
