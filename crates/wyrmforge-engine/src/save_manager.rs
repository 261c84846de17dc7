//! Snapshot persistence.
//!
//! This module provides:
//! - SnapshotStore: the storage seam the runtime saves through
//! - JsonFileStore: one JSON file per save, written atomically (temp file + rename),
//!   with a `.bak` file beside it for snapshots the engine could not load
//! - MemoryStore: an in-process store for tests

use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during save operations.
#[derive(Debug, Error)]
pub enum SaveError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid save name.
    #[error("Invalid save name: {0}")]
    InvalidSaveName(String),

    /// Atomic write failed.
    #[error("Atomic write failed: {0}")]
    AtomicWriteFailed(String),
}

/// Result type for save operations.
pub type SaveResult<T> = Result<T, SaveError>;

/// Storage for the latest snapshot.
pub trait SnapshotStore: Send {
    /// Loads the latest snapshot, `None` if nothing was saved yet.
    fn load(&self) -> SaveResult<Option<Value>>;

    /// Replaces the stored snapshot.
    fn save(&mut self, snapshot: &Value) -> SaveResult<()>;

    /// Keeps a snapshot the engine rejected, apart from the regular save.
    fn backup(&mut self, snapshot: &Value) -> SaveResult<()>;
}

/// Stores the snapshot as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    save_dir: PathBuf,
    save_name: String,
}

impl JsonFileStore {
    /// Creates a store. The directory is created on first save.
    pub fn new(save_dir: impl AsRef<Path>, save_name: impl Into<String>) -> SaveResult<Self> {
        let save_name = save_name.into();
        Self::validate_save_name(&save_name)?;
        Ok(Self {
            save_dir: save_dir.as_ref().to_path_buf(),
            save_name,
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.save_dir.join(format!("{}.json", self.save_name))
    }

    /// Path of the backup of a rejected snapshot.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.save_dir.join(format!("{}.bak", self.save_name))
    }

    /// Moves an unreadable snapshot file to the backup path so the next save
    /// cannot overwrite it.
    pub fn set_aside(&self) -> SaveResult<PathBuf> {
        let backup = self.backup_path();
        fs::rename(self.path(), &backup)?;
        info!("Moved unreadable snapshot to {}", backup.display());
        Ok(backup)
    }

    fn temp_path(&self) -> PathBuf {
        self.save_dir.join(format!("{}.tmp", self.save_name))
    }

    fn write_atomic(&self, final_path: &Path, snapshot: &Value) -> SaveResult<()> {
        fs::create_dir_all(&self.save_dir)?;
        let temp_path = self.temp_path();

        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer_pretty(&mut writer, snapshot)
                .map_err(|e| SaveError::Serialization(e.to_string()))?;
            writer.flush()?;
        }

        fs::rename(&temp_path, final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            SaveError::AtomicWriteFailed(e.to_string())
        })?;

        debug!("Atomic write complete: {}", final_path.display());
        Ok(())
    }

    fn validate_save_name(save_name: &str) -> SaveResult<()> {
        if save_name.is_empty() {
            return Err(SaveError::InvalidSaveName("Empty save name".to_string()));
        }

        let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
        for c in invalid_chars {
            if save_name.contains(c) {
                return Err(SaveError::InvalidSaveName(format!(
                    "Invalid character '{c}' in save name"
                )));
            }
        }

        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> SaveResult<Option<Value>> {
        let path = self.path();
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let snapshot = serde_json::from_reader(reader)
            .map_err(|e| SaveError::Deserialization(e.to_string()))?;

        info!("Loaded snapshot from {}", path.display());
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Value) -> SaveResult<()> {
        self.write_atomic(&self.path(), snapshot)
    }

    fn backup(&mut self, snapshot: &Value) -> SaveResult<()> {
        let path = self.backup_path();
        self.write_atomic(&path, snapshot)?;
        info!("Backed up rejected snapshot to {}", path.display());
        Ok(())
    }
}

/// Keeps the snapshot in memory. Clones share the same slots.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    latest: std::sync::Arc<parking_lot::Mutex<Option<Value>>>,
    backup: std::sync::Arc<parking_lot::Mutex<Option<Value>>>,
}

#[cfg(test)]
impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently saved snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Value> {
        self.latest.lock().clone()
    }

    /// The most recently backed-up snapshot.
    #[must_use]
    pub fn backed_up(&self) -> Option<Value> {
        self.backup.lock().clone()
    }
}

#[cfg(test)]
impl SnapshotStore for MemoryStore {
    fn load(&self) -> SaveResult<Option<Value>> {
        Ok(self.latest())
    }

    fn save(&mut self, snapshot: &Value) -> SaveResult<()> {
        *self.latest.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn backup(&mut self, snapshot: &Value) -> SaveResult<()> {
        *self.backup.lock() = Some(snapshot.clone());
        Ok(())
    }
}
