//! Durable emotion log and cross-view synchronization.

pub mod backend;
pub mod export;
pub mod log;
pub mod notify;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, STORAGE_KEY};
pub use export::{render, write_export, ExportFormat};
pub use log::EmotionLogStore;
pub use notify::{ChangeNotifier, ChangeSubscription, StoreWatcher};

/// Storage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Io(String),
    Serialize(String),
    /// The write would exceed the storage quota
    QuotaExceeded { needed: u64, limit: u64 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {e}"),
            StoreError::Serialize(e) => write!(f, "Serialize error: {e}"),
            StoreError::QuotaExceeded { needed, limit } => {
                write!(f, "Storage quota exceeded ({needed} bytes needed, limit {limit})")
            }
        }
    }
}

impl std::error::Error for StoreError {}
