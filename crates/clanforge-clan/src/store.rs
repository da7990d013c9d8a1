//! Persistence seam for the clan table.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::{ClanTable, StoreError};

/// Loads and saves the whole clan table.
///
/// Calls are synchronous and may block; [`ClanHall`](crate::ClanHall)
/// runs saves on the blocking pool. The table is saved after every
/// mutation.
pub trait ClanStore: Send + Sync + 'static {
    /// Returns the saved table, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<ClanTable>, StoreError>;

    fn save(&self, table: &ClanTable) -> Result<(), StoreError>;
}

impl<S: ClanStore> ClanStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<ClanTable>, StoreError> {
        (**self).load()
    }

    fn save(&self, table: &ClanTable) -> Result<(), StoreError> {
        (**self).save(table)
    }
}

/// Stores the table as pretty JSON in a single file.
///
/// Saves go to a sibling `.tmp` file first and are renamed over the
/// target, so a crash never leaves a half-written table behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClanStore for JsonFileStore {
    fn load(&self) -> Result<Option<ClanTable>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, table: &ClanTable) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(table)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps the last saved table in memory. Used when no clan file is
/// configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<ClanTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently saved table.
    pub fn snapshot(&self) -> Option<ClanTable> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClanStore for MemoryStore {
    fn load(&self) -> Result<Option<ClanTable>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, table: &ClanTable) -> Result<(), StoreError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_store_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("clans.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_json_file_store_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data").join("clans.json"));

        let mut table = ClanTable::default();
        table.allocate_id();
        store.save(&table).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.next_id, 2);
        assert!(!dir.path().join("data").join("clans.tmp").exists());
    }

    #[test]
    fn test_json_file_store_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clans.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }
}
