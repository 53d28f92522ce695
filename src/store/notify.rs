//! Change notification for the emotion log.
//!
//! Views never share their in-memory log. When the durable log changes, a
//! payload-free signal is raised and every view reloads from storage.
//! Within one process the signal travels over a [`ChangeNotifier`]; across
//! processes a [`StoreWatcher`] polls the backend's revision marker and
//! turns external changes into the same local signal.

use crate::store::backend::StorageBackend;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// In-process change signal.
///
/// Internally a counter on a watch channel: bursts of changes coalesce into
/// one wakeup, which is fine because the only reaction is a full reload.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: Arc<watch::Sender<u64>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(0u64);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Signal that the durable log changed.
    pub fn notify(&self) {
        self.sender.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Subscribe to future change signals.
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of signals raised so far.
    pub fn signal_count(&self) -> u64 {
        *self.sender.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a [`ChangeNotifier`].
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: watch::Receiver<u64>,
}

impl ChangeSubscription {
    /// Wait for the next change. Returns `false` once the notifier is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Whether a change arrived that has not been acknowledged yet.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Acknowledge any pending change.
    pub fn mark_seen(&mut self) {
        self.receiver.borrow_and_update();
    }
}

/// Last revision marker this process knows about, shared between a store
/// and its watcher so a store's own writes are not reported back as external.
pub(crate) type KnownRevision = Arc<Mutex<Option<String>>>;

pub(crate) fn lock_known(known: &KnownRevision) -> std::sync::MutexGuard<'_, Option<String>> {
    match known.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Detects changes made by other processes sharing the same storage.
pub struct StoreWatcher {
    backend: Arc<dyn StorageBackend>,
    notifier: ChangeNotifier,
    known: KnownRevision,
}

impl StoreWatcher {
    pub(crate) fn new(
        backend: Arc<dyn StorageBackend>,
        notifier: ChangeNotifier,
        known: KnownRevision,
    ) -> Self {
        Self {
            backend,
            notifier,
            known,
        }
    }

    /// Check the revision marker once. Returns `true` if a change was signalled.
    pub fn poll_once(&self) -> bool {
        let current = match self.backend.revision() {
            Ok(revision) => revision,
            Err(e) => {
                warn!("Could not read store revision: {e}");
                return false;
            }
        };

        {
            let mut known = lock_known(&self.known);
            if *known == current {
                return false;
            }
            *known = current;
        }

        debug!("External change to the emotion log detected");
        self.notifier.notify();
        true
    }

    /// Poll until cancelled.
    pub async fn run(self, poll_interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once();
                }
                _ = cancel.cancelled() => {
                    debug!("Store watcher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::MemoryBackend;

    #[tokio::test]
    async fn test_notifier_wakes_subscribers() {
        let notifier = ChangeNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        assert!(!a.has_changed());

        notifier.notify();
        assert!(a.changed().await);
        assert!(b.has_changed());
        b.mark_seen();
        assert!(!b.has_changed());
    }

    #[test]
    fn test_watcher_reports_external_revisions_only() {
        let backend = MemoryBackend::new();
        let notifier = ChangeNotifier::new();
        let known: KnownRevision = Arc::new(Mutex::new(None));
        let watcher = StoreWatcher::new(Arc::new(backend.clone()), notifier.clone(), known.clone());

        assert!(!watcher.poll_once());

        backend.set_revision("from-elsewhere").unwrap();
        assert!(watcher.poll_once());
        assert_eq!(notifier.signal_count(), 1);
        assert!(!watcher.poll_once());

        // A revision this process wrote itself is already known
        *lock_known(&known) = Some("ours".to_string());
        backend.set_revision("ours").unwrap();
        assert!(!watcher.poll_once());
        assert_eq!(notifier.signal_count(), 1);
    }
}
