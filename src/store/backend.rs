//! Durable storage backends.
//!
//! A backend holds a single serialized value (the whole log) plus a revision
//! marker that changes on every write, so other processes sharing the same
//! storage can tell that something changed.

use crate::store::StoreError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Storage key used for the emotion log.
pub const STORAGE_KEY: &str = "emotion-tracker-logs";

/// A single durable key.
pub trait StorageBackend: Send + Sync {
    /// Read the stored value, `None` when absent.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored value.
    fn write(&self, contents: &str) -> Result<(), StoreError>;

    /// Read the current revision marker, `None` when never written.
    fn revision(&self) -> Result<Option<String>, StoreError>;

    /// Replace the revision marker.
    fn set_revision(&self, revision: &str) -> Result<(), StoreError>;
}

fn check_quota(contents: &str, quota_bytes: Option<u64>) -> Result<(), StoreError> {
    if let Some(limit) = quota_bytes {
        let needed = contents.len() as u64;
        if needed > limit {
            return Err(StoreError::QuotaExceeded { needed, limit });
        }
    }
    Ok(())
}

/// File-backed storage: `<dir>/<key>.json` and `<dir>/<key>.rev`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    data_path: PathBuf,
    revision_path: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    /// Create a backend for `key` inside `dir`.
    pub fn new(dir: &Path, key: &str) -> Self {
        Self {
            data_path: dir.join(format!("{key}.json")),
            revision_path: dir.join(format!("{key}.rev")),
            quota_bytes: None,
        }
    }

    /// Limit the size of the stored value.
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    /// Write via a temp file and rename so readers never see a partial file.
    fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, contents).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Io(e.to_string())
        })
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Self::read_optional(&self.data_path)
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        check_quota(contents, self.quota_bytes)?;
        Self::write_atomic(&self.data_path, contents)
    }

    fn revision(&self) -> Result<Option<String>, StoreError> {
        Ok(Self::read_optional(&self.revision_path)?.map(|r| r.trim().to_string()))
    }

    fn set_revision(&self, revision: &str) -> Result<(), StoreError> {
        Self::write_atomic(&self.revision_path, revision)
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    value: Option<String>,
    revision: Option<String>,
}

/// In-process storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<MemorySlot>>,
    quota_bytes: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Overwrite the raw stored value, bypassing quota and revision.
    pub fn put_raw(&self, contents: &str) {
        self.lock().value = Some(contents.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock().value.clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        check_quota(contents, self.quota_bytes)?;
        self.lock().value = Some(contents.to_string());
        Ok(())
    }

    fn revision(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock().revision.clone())
    }

    fn set_revision(&self, revision: &str) -> Result<(), StoreError> {
        self.lock().revision = Some(revision.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("emotion-tracker-backend-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = temp_dir();
        let backend = FileBackend::new(&dir, STORAGE_KEY);

        assert_eq!(backend.read().unwrap(), None);
        assert_eq!(backend.revision().unwrap(), None);

        backend.write("[]").unwrap();
        backend.set_revision("rev-1").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.revision().unwrap().as_deref(), Some("rev-1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_quota_rejects_large_writes() {
        let backend = MemoryBackend::new().with_quota(Some(4));
        backend.write("[]").unwrap();

        let err = backend.write("[1,2,3]").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 7, limit: 4 }));
        // Previous value is untouched
        assert_eq!(backend.read().unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_backend_clones_share_storage() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.write("x").unwrap();
        assert_eq!(b.read().unwrap().as_deref(), Some("x"));
    }
}
