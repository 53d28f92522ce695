//! Per-view tracker facade.
//!
//! An [`EmotionTracker`] is what one open view works with: its own replica of
//! the log, its own logging gate, the live reading for real-time display and
//! the transparency counters. Views never share replicas; they stay in step
//! by reloading whenever the change notification fires.

use crate::config::Config;
use crate::core::gate::{GateOutcome, GatePolicy, LoggingGate, Rejection};
use crate::core::stats::{self, EmotionStats, DEFAULT_RECENT_WINDOW_HOURS};
use crate::core::time_of_day::LocalZone;
use crate::core::EmotionLogEntry;
use crate::detector::types::{DetectionSample, Emotion, FaceRegion};
use crate::store::{ChangeSubscription, EmotionLogStore, FileBackend, StoreError, STORAGE_KEY};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The dominant emotion of the latest sample, before gating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentReading {
    pub emotion: Emotion,
    pub confidence: f64,
    pub region: FaceRegion,
    pub observed_at: DateTime<Utc>,
}

/// What happened to one detection sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// No face (or no usable scores) in the sample
    NoFace,
    /// A candidate was produced but the gate turned it down
    Rejected(Rejection),
    /// A new entry was appended to the log
    Logged(EmotionLogEntry),
    /// The gate accepted the candidate but persisting it failed
    WriteFailed(StoreError),
}

/// One view on the emotion log.
pub struct EmotionTracker {
    store: EmotionLogStore,
    gate: Mutex<LoggingGate>,
    current: watch::Sender<Option<CurrentReading>>,
    transparency: SharedTransparencyLog,
    zone: LocalZone,
    recent_window_hours: f64,
}

impl EmotionTracker {
    pub fn new(store: EmotionLogStore, policy: GatePolicy, zone: LocalZone) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            store,
            gate: Mutex::new(LoggingGate::new(policy, zone)),
            current,
            transparency: create_shared_log(),
            zone,
            recent_window_hours: DEFAULT_RECENT_WINDOW_HOURS,
        }
    }

    /// Open a tracker over the file store described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let backend = FileBackend::new(&config.data_path, STORAGE_KEY)
            .with_quota(config.storage_quota_bytes);
        let store = EmotionLogStore::open(Arc::new(backend));
        Self::new(store, config.gate_policy(), config.local_zone())
            .with_recent_window(config.recent_window_hours)
    }

    /// Use a specific transparency log instead of a fresh one.
    pub fn with_transparency(mut self, transparency: SharedTransparencyLog) -> Self {
        self.transparency = transparency;
        self
    }

    /// Change the window used by [`recent_default`](Self::recent_default).
    pub fn with_recent_window(mut self, hours: f64) -> Self {
        self.recent_window_hours = hours;
        self
    }

    pub fn store(&self) -> &EmotionLogStore {
        &self.store
    }

    pub fn transparency(&self) -> &SharedTransparencyLog {
        &self.transparency
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// The replica, in chronological order.
    pub fn entries(&self) -> Vec<EmotionLogEntry> {
        self.store.entries()
    }

    /// The most recent confirmed entry.
    pub fn latest_entry(&self) -> Option<EmotionLogEntry> {
        self.store.latest()
    }

    /// Aggregate statistics, recomputed from the replica.
    pub fn stats(&self) -> EmotionStats {
        self.store.with_entries(stats::compute_stats)
    }

    /// Entries newer than `window_hours` ago.
    pub fn recent(&self, window_hours: f64) -> Vec<EmotionLogEntry> {
        let now = Utc::now();
        self.store
            .with_entries(|entries| stats::recent_entries(entries, window_hours, now))
    }

    /// Entries inside the configured recent window.
    pub fn recent_default(&self) -> Vec<EmotionLogEntry> {
        self.recent(self.recent_window_hours)
    }

    /// Up to `limit` entries of the recent window, newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<EmotionLogEntry> {
        let now = Utc::now();
        let hours = self.recent_window_hours;
        self.store
            .with_entries(|entries| stats::recent_activity(entries, hours, limit, now))
    }

    /// Erase the whole log for every view.
    ///
    /// The gate keeps its last accepted emotion, so a steady expression is
    /// not logged again right after a clear.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.clear()
    }

    /// The live reading, if a face is currently visible.
    pub fn current(&self) -> Option<CurrentReading> {
        self.current.borrow().clone()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<CurrentReading>> {
        self.current.subscribe()
    }

    pub fn subscribe_changes(&self) -> ChangeSubscription {
        self.store.subscribe()
    }

    /// Drop the live reading.
    pub fn clear_current(&self) {
        self.current.send_if_modified(|current| current.take().is_some());
    }

    /// Refresh the replica from durable storage.
    pub fn reload(&self) -> usize {
        self.store.reload()
    }

    /// Handle one detection sample observed at `now`.
    pub fn observe(&self, sample: &DetectionSample, now: DateTime<Utc>) -> Observation {
        let candidate = sample
            .primary_face()
            .and_then(|face| face.expressions.dominant().map(|d| (face.region, d)));

        let Some((region, (emotion, confidence))) = candidate else {
            self.transparency.record_no_face();
            self.clear_current();
            return Observation::NoFace;
        };

        self.transparency.record_face_detected();
        self.current.send_replace(Some(CurrentReading {
            emotion,
            confidence,
            region,
            observed_at: now,
        }));

        let outcome = self.lock_gate().consider(emotion, confidence, now);
        let entry = match outcome {
            GateOutcome::Accepted(entry) => entry,
            GateOutcome::Rejected(rejection) => {
                match rejection {
                    Rejection::LowConfidence => self.transparency.record_low_confidence(),
                    Rejection::Debounced => self.transparency.record_debounced(),
                }
                debug!("Skipped {emotion} ({confidence:.2}): {rejection:?}");
                return Observation::Rejected(rejection);
            }
        };

        match self.store.append(vec![entry.clone()]) {
            Ok(()) => {
                self.transparency.record_entry_logged();
                info!(
                    "Logged {} ({:.0}%, {})",
                    entry.emotion,
                    entry.confidence * 100.0,
                    entry.time_of_day
                );
                Observation::Logged(entry)
            }
            Err(e) => {
                self.transparency.record_write_failure();
                warn!("Entry for {emotion} was dropped: {e}");
                Observation::WriteFailed(e)
            }
        }
    }

    /// Reload on every change notification until cancelled.
    pub async fn run_sync(&self, cancel: CancellationToken) {
        let mut changes = self.subscribe_changes();
        // Catch up on anything that changed before we subscribed
        self.reload();
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if !changed {
                        break;
                    }
                    self.reload();
                }
                _ = cancel.cancelled() => break,
            }
        }
        debug!("Sync loop stopped");
    }

    fn lock_gate(&self) -> MutexGuard<'_, LoggingGate> {
        match self.gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
