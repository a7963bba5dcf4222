//! Durable storage for the serialized entry map
//!
//! The cache owns exactly one slot in whatever backend it is given and writes
//! the whole map there as a single JSON document after every mutation.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Backend refused the operation (quota, read-only, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Load/save capability for the cache's single storage slot
pub trait CacheStorage: Send + Sync {
    /// Read the stored bytes, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the stored bytes
    fn save(&self, bytes: &[u8]) -> Result<(), StorageError>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Arc<S> {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load()
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).save(bytes)
    }
}

/// Storage that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

impl CacheStorage for NullStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn save(&self, _bytes: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }
}

/// In-process storage slot.
///
/// Failures can be switched on to exercise the cache's best-effort paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<Vec<u8>>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemoryStorage {
    /// Empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `bytes`
    #[must_use]
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Current contents
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }

    /// Make every subsequent `load` fail
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent `save` fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }
}

impl CacheStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_loads.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("load disabled".to_string()));
        }
        Ok(self.data.lock().clone())
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        *self.data.lock() = Some(bytes.to_vec());
        Ok(())
    }
}

/// A single JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage backed by `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStorage for FileStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated document
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
