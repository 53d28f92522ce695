//! Append-only emotion log with an in-memory replica.
//!
//! The durable copy in the backend is the source of truth. Each store keeps a
//! replica for fast reads and refreshes it on every change notification.
//! The only mutations are append-many and clear-all.

use crate::core::entry::EmotionLogEntry;
use crate::store::backend::StorageBackend;
use crate::store::notify::{lock_known, ChangeNotifier, ChangeSubscription, KnownRevision, StoreWatcher};
use crate::store::StoreError;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One view's handle on the shared emotion log.
pub struct EmotionLogStore {
    backend: Arc<dyn StorageBackend>,
    notifier: ChangeNotifier,
    replica: RwLock<Vec<EmotionLogEntry>>,
    known_revision: KnownRevision,
}

impl EmotionLogStore {
    /// Open a store with its own notifier.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_notifier(backend, ChangeNotifier::new())
    }

    /// Open a store that shares a notifier with other views in this process.
    pub fn with_notifier(backend: Arc<dyn StorageBackend>, notifier: ChangeNotifier) -> Self {
        let known = backend.revision().ok().flatten();
        let store = Self {
            backend,
            notifier,
            replica: RwLock::new(Vec::new()),
            known_revision: Arc::new(Mutex::new(known)),
        };
        store.reload();
        store
    }

    /// Read the durable log.
    ///
    /// Absent, unreadable or malformed data all yield an empty log.
    pub fn load(&self) -> Vec<EmotionLogEntry> {
        match self.read_durable() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not read emotion log, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Replace the replica with the durable log. Returns the entry count.
    pub fn reload(&self) -> usize {
        let entries = self.load();
        let count = entries.len();
        *self.write_replica() = entries;
        debug!("Emotion log replica reloaded ({count} entries)");
        count
    }

    /// Append entries to the end of the log and persist it.
    ///
    /// On a failed write the replica is reloaded from storage and the error
    /// is returned; nothing is retried.
    pub fn append(&self, entries: Vec<EmotionLogEntry>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let added = entries.len();
        let result = self.read_durable().and_then(|mut log| {
            log.extend(entries);
            self.persist(&log)?;
            Ok(log)
        });

        match result {
            Ok(log) => {
                info!("Appended {added} entries (log size {})", log.len());
                *self.write_replica() = log;
                self.notifier.notify();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to append {added} entries: {e}");
                self.reload();
                Err(e)
            }
        }
    }

    /// Remove every entry and persist the empty log.
    pub fn clear(&self) -> Result<(), StoreError> {
        match self.persist(&[]) {
            Ok(()) => {
                info!("Emotion log cleared");
                self.write_replica().clear();
                self.notifier.notify();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to clear emotion log: {e}");
                self.reload();
                Err(e)
            }
        }
    }

    /// Snapshot of the replica.
    pub fn entries(&self) -> Vec<EmotionLogEntry> {
        self.read_replica().clone()
    }

    /// Run a closure against the replica without cloning it.
    pub fn with_entries<R>(&self, f: impl FnOnce(&[EmotionLogEntry]) -> R) -> R {
        f(&self.read_replica())
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<EmotionLogEntry> {
        self.read_replica().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.read_replica().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_replica().is_empty()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        self.notifier.subscribe()
    }

    /// A watcher that signals this store's notifier on external changes.
    pub fn watcher(&self) -> StoreWatcher {
        StoreWatcher::new(
            self.backend.clone(),
            self.notifier.clone(),
            self.known_revision.clone(),
        )
    }

    fn read_durable(&self) -> Result<Vec<EmotionLogEntry>, StoreError> {
        let Some(content) = self.backend.read()? else {
            return Ok(Vec::new());
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Stored emotion log is malformed, ignoring it: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Write the full log, then bump the revision marker.
    fn persist(&self, entries: &[EmotionLogEntry]) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(entries).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.backend.write(&json)?;

        let revision = Uuid::new_v4().to_string();
        *lock_known(&self.known_revision) = Some(revision.clone());
        if let Err(e) = self.backend.set_revision(&revision) {
            // The log itself is durable; other processes just won't see the change until the next one
            warn!("Could not update store revision marker: {e}");
        }
        Ok(())
    }

    fn read_replica(&self) -> RwLockReadGuard<'_, Vec<EmotionLogEntry>> {
        match self.replica.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_replica(&self) -> RwLockWriteGuard<'_, Vec<EmotionLogEntry>> {
        match self.replica.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
