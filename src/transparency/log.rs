//! Processing transparency counters.
//!
//! Tracks how many frames were looked at and what happened to them, without
//! keeping any frame or face data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Counters for the current capture session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Frames handed to the detector
    frames_sampled: AtomicU64,
    /// Samples with at least one face
    faces_detected: AtomicU64,
    /// Samples with no face
    no_face_samples: AtomicU64,
    /// Detector calls that failed or timed out
    detector_failures: AtomicU64,
    /// Candidates at or below the confidence threshold
    low_confidence_rejections: AtomicU64,
    /// Repeats inside the debounce window
    debounced_candidates: AtomicU64,
    /// Entries written to the log
    entries_logged: AtomicU64,
    /// Entries lost to a failed write
    write_failures: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            frames_sampled: AtomicU64::new(0),
            faces_detected: AtomicU64::new(0),
            no_face_samples: AtomicU64::new(0),
            detector_failures: AtomicU64::new(0),
            low_confidence_rejections: AtomicU64::new(0),
            debounced_candidates: AtomicU64::new(0),
            entries_logged: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that accumulates on top of previously saved counters.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!("Could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_frame_sampled(&self) {
        self.frames_sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_face_detected(&self) {
        self.faces_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_face(&self) {
        self.no_face_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detector_failure(&self) {
        self.detector_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_low_confidence(&self) {
        self.low_confidence_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounced(&self) {
        self.debounced_candidates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_logged(&self) {
        self.entries_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            faces_detected: self.faces_detected.load(Ordering::Relaxed),
            no_face_samples: self.no_face_samples.load(Ordering::Relaxed),
            detector_failures: self.detector_failures.load(Ordering::Relaxed),
            low_confidence_rejections: self.low_confidence_rejections.load(Ordering::Relaxed),
            debounced_candidates: self.debounced_candidates.load(Ordering::Relaxed),
            entries_logged: self.entries_logged.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames sampled: {}\n\
             - Samples with a face: {}\n\
             - Samples without a face: {}\n\
             - Detector failures: {}\n\
             - Low-confidence candidates skipped: {}\n\
             - Repeats skipped (debounce): {}\n\
             - Entries logged: {}\n\
             - Entries lost to write failures: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No video frames stored\n\
             - No face images or positions stored\n\
             - Only emotion label, confidence and time retained",
            stats.frames_sampled,
            stats.faces_detected,
            stats.no_face_samples,
            stats.detector_failures,
            stats.low_confidence_rejections,
            stats.debounced_candidates,
            stats.entries_logged,
            stats.write_failures,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_sampled: stats.frames_sampled,
                faces_detected: stats.faces_detected,
                no_face_samples: stats.no_face_samples,
                detector_failures: stats.detector_failures,
                low_confidence_rejections: stats.low_confidence_rejections,
                debounced_candidates: stats.debounced_candidates,
                entries_logged: stats.entries_logged,
                write_failures: stats.write_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_sampled
                    .store(persisted.frames_sampled, Ordering::Relaxed);
                self.faces_detected
                    .store(persisted.faces_detected, Ordering::Relaxed);
                self.no_face_samples
                    .store(persisted.no_face_samples, Ordering::Relaxed);
                self.detector_failures
                    .store(persisted.detector_failures, Ordering::Relaxed);
                self.low_confidence_rejections
                    .store(persisted.low_confidence_rejections, Ordering::Relaxed);
                self.debounced_candidates
                    .store(persisted.debounced_candidates, Ordering::Relaxed);
                self.entries_logged
                    .store(persisted.entries_logged, Ordering::Relaxed);
                self.write_failures
                    .store(persisted.write_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_sampled.store(0, Ordering::Relaxed);
        self.faces_detected.store(0, Ordering::Relaxed);
        self.no_face_samples.store(0, Ordering::Relaxed);
        self.detector_failures.store(0, Ordering::Relaxed);
        self.low_confidence_rejections.store(0, Ordering::Relaxed);
        self.debounced_candidates.store(0, Ordering::Relaxed);
        self.entries_logged.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub frames_sampled: u64,
    pub faces_detected: u64,
    pub no_face_samples: u64,
    pub detector_failures: u64,
    pub low_confidence_rejections: u64,
    pub debounced_candidates: u64,
    pub entries_logged: u64,
    pub write_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_sampled: u64,
    faces_detected: u64,
    no_face_samples: u64,
    detector_failures: u64,
    low_confidence_rejections: u64,
    debounced_candidates: u64,
    entries_logged: u64,
    write_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let log = TransparencyLog::new();

        log.record_frame_sampled();
        log.record_frame_sampled();
        log.record_face_detected();
        log.record_no_face();
        log.record_entry_logged();

        let stats = log.stats();
        assert_eq!(stats.frames_sampled, 2);
        assert_eq!(stats.faces_detected, 1);
        assert_eq!(stats.no_face_samples, 1);
        assert_eq!(stats.entries_logged, 1);
        assert_eq!(stats.detector_failures, 0);
    }

    #[test]
    fn test_reset() {
        let log = TransparencyLog::new();
        log.record_debounced();
        log.record_low_confidence();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.debounced_candidates, 0);
        assert_eq!(stats.low_confidence_rejections, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let path = std::env::temp_dir()
            .join(format!("emotion-tracker-transparency-{}", uuid::Uuid::new_v4()))
            .join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_entry_logged();
        log.record_entry_logged();
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path.clone());
        assert_eq!(reloaded.stats().entries_logged, 2);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_reset_persists_zeroes() {
        let path = std::env::temp_dir()
            .join(format!("emotion-tracker-transparency-{}", uuid::Uuid::new_v4()))
            .join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_frame_sampled();
        log.record_entry_logged();
        log.save().unwrap();

        let reopened = TransparencyLog::with_persistence(path.clone());
        assert_eq!(reopened.stats().entries_logged, 1);
        reopened.reset();
        reopened.save().unwrap();

        let stats = TransparencyLog::with_persistence(path.clone()).stats();
        assert_eq!(stats.frames_sampled, 0);
        assert_eq!(stats.entries_logged, 0);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_summary_format() {
        let summary = TransparencyLog::new().summary();
        assert!(summary.contains("Frames sampled"));
        assert!(summary.contains("Entries logged"));
        assert!(summary.contains("No video frames stored"));
    }
}
