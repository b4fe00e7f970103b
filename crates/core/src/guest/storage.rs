//! Durable key-value slot backing the guest store.
//!
//! [`GuestStorage`] is the seam between [`GuestStore`](super::GuestStore)
//! and whatever medium actually holds the blob. Two implementations ship:
//!
//! - [`MemoryStorage`]: process-local, optionally unavailable (for tests and
//!   for sessions where persistence is disabled).
//! - [`FileStorage`]: one JSON file per key in a directory, replaced
//!   atomically on every save.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors raised by a storage medium.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single durable slot holding the serialized guest state.
pub trait GuestStorage: Send + Sync {
    /// Check that the medium accepts writes.
    fn probe(&self) -> Result<(), StorageError>;

    /// Read the raw slot value, `None` if the slot is empty.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the slot value.
    fn save(&self, value: &str) -> Result<(), StorageError>;

    /// Remove the slot. Clearing an empty slot succeeds.
    fn clear(&self) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process slot.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-populated with a raw value (which need not be valid JSON).
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(value.into())),
            unavailable: false,
        }
    }

    /// A slot that rejects every operation, as when the user or browser
    /// policy has disabled storage.
    pub fn unavailable() -> Self {
        Self {
            slot: Mutex::new(None),
            unavailable: true,
        }
    }

    /// Peek at the raw slot value.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn with_slot<T>(
        &self,
        f: impl FnOnce(&mut Option<String>) -> T,
    ) -> Result<T, StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))?;
        Ok(f(&mut slot))
    }
}

impl GuestStorage for MemoryStorage {
    fn probe(&self) -> Result<(), StorageError> {
        self.with_slot(|_| ())
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        self.with_slot(|slot| slot.clone())
    }

    fn save(&self, value: &str) -> Result<(), StorageError> {
        self.with_slot(|slot| *slot = Some(value.to_string()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.with_slot(|slot| *slot = None)
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// A slot stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    key: String,
}

impl FileStorage {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    /// A staging path unique to this write, so concurrent writers never
    /// share one.
    fn tmp_path(&self) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.json.tmp", self.key, uuid::Uuid::new_v4()))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| unavailable_or_io(&self.dir, e))
    }
}

impl GuestStorage for FileStorage {
    fn probe(&self) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let probe = self.dir.join(format!(".probe-{}", uuid::Uuid::new_v4()));
        fs::write(&probe, b"probe").map_err(|e| unavailable_or_io(&self.dir, e))?;
        fs::remove_file(&probe)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path()) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Non-UTF-8 content is a corrupt blob, not a storage failure.
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let tmp = self.tmp_path();
        let written = write_synced(&tmp, value).and_then(|()| fs::rename(&tmp, self.path()));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

fn unavailable_or_io(dir: &Path, err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
            StorageError::Unavailable(format!("{}: {err}", dir.display()))
        }
        _ => StorageError::Io(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
