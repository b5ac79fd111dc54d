//! Park status persistence
//!
//! The cap has no position sensor, so the last completed full move is the
//! only record of whether it is parked. It survives restarts through a park
//! store.

use crate::error::CapResult;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Persisted park record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkData {
    pub parked: bool,
}

/// Load/save pair for the park status
pub trait ParkStore: Send + Sync + Debug {
    fn load(&self) -> CapResult<ParkData>;
    fn save(&self, data: ParkData) -> CapResult<()>;
}

/// JSON file backed park store
#[derive(Debug, Clone)]
pub struct FileParkStore {
    path: PathBuf,
}

impl FileParkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParkStore for FileParkStore {
    fn load(&self) -> CapResult<ParkData> {
        if !self.path.exists() {
            return Ok(ParkData::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, data: ParkData) -> CapResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string(&data)?)?;
        Ok(())
    }
}

/// In-memory park store; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryParkStore {
    data: Arc<Mutex<ParkData>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryParkStore {
    pub fn with_parked(parked: bool) -> Self {
        let store = Self::default();
        if let Ok(mut data) = store.data.lock() {
            data.parked = parked;
        }
        store
    }

    pub fn is_parked(&self) -> bool {
        self.data.lock().map(|d| d.parked).unwrap_or(false)
    }

    /// Number of times the record was written
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| *s).unwrap_or(0)
    }
}

impl ParkStore for MemoryParkStore {
    fn load(&self) -> CapResult<ParkData> {
        Ok(self.data.lock().map(|d| *d).unwrap_or_default())
    }

    fn save(&self, data: ParkData) -> CapResult<()> {
        if let Ok(mut current) = self.data.lock() {
            *current = data;
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_defaults_to_unparked() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileParkStore::new(dir.path().join("park.json"));
        assert!(!store.load().unwrap().parked);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("park.json");

        FileParkStore::new(&path).save(ParkData { parked: true }).unwrap();
        assert!(FileParkStore::new(&path).load().unwrap().parked);
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("park.json");
        std::fs::write(&path, "parked").unwrap();
        assert!(FileParkStore::new(&path).load().is_err());
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryParkStore::with_parked(true);
        let clone = store.clone();
        clone.save(ParkData { parked: false }).unwrap();
        assert!(!store.is_parked());
        assert_eq!(store.save_count(), 1);
    }
}
