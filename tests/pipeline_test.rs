//! Integration tests for the capture-to-statistics pipeline

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use emotion_tracker::core::{
    compute_stats, recent_entries, sampling_loop, GatePolicy, LocalZone, SamplingSettings,
    StopReason, TimeOfDay,
};
use emotion_tracker::detector::{
    ChannelFrameSource, DetectionSample, DetectorError, Emotion, ExpressionDetector,
    ExpressionScores, FaceRegion, Frame, ReplayDetector,
};
use emotion_tracker::store::{EmotionLogStore, FileBackend, MemoryBackend, STORAGE_KEY};
use emotion_tracker::{EmotionLogEntry, EmotionTracker};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn tracker(backend: MemoryBackend) -> Arc<EmotionTracker> {
    Arc::new(EmotionTracker::new(
        EmotionLogStore::open(Arc::new(backend)),
        GatePolicy::default(),
        LocalZone::Named(chrono_tz::UTC),
    ))
}

fn settings() -> SamplingSettings {
    SamplingSettings {
        interval: Duration::from_millis(5),
        detector_timeout: Duration::from_millis(50),
    }
}

/// A detector whose calls never complete.
struct StalledDetector {
    calls: AtomicUsize,
}

impl ExpressionDetector for StalledDetector {
    fn is_ready(&self) -> bool {
        true
    }

    fn classify(
        &self,
        _frame: &Frame,
    ) -> impl Future<Output = Result<DetectionSample, DetectorError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async {
            std::future::pending::<()>().await;
            Ok(DetectionSample::single(
                FaceRegion::default(),
                ExpressionScores::new().with(Emotion::Happy, 0.99),
            ))
        }
    }
}

#[tokio::test]
async fn test_replay_session_logs_gated_entries() {
    let replay = ReplayDetector::parse(
        r#"
{"faces": [{"region": {"x": 0, "y": 0, "width": 10, "height": 10}, "expressions": {"happy": 0.9, "neutral": 0.1}}]}
{"faces": []}
{"error": "transient"}
{"faces": [{"region": {"x": 0, "y": 0, "width": 10, "height": 10}, "expressions": {"sad": 0.55, "neutral": 0.45}}]}
{"faces": [{"region": {"x": 0, "y": 0, "width": 10, "height": 10}, "expressions": {"happy": 0.85, "surprise": 0.1}}]}
"#,
    )
    .unwrap();
    assert_eq!(replay.len(), 5);

    let (feed, source) = ChannelFrameSource::channel();
    feed.set_active(true);
    feed.push(Frame::blank(8, 8));

    let tracker = tracker(MemoryBackend::new());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(sampling_loop(
        Arc::new(replay),
        Arc::new(source),
        tracker.clone(),
        settings(),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    assert_eq!(handle.await.unwrap(), StopReason::Cancelled);

    // sad never clears the threshold and every later happy is a repeat
    let emotions: Vec<Emotion> = tracker.entries().iter().map(|e| e.emotion).collect();
    assert_eq!(emotions, vec![Emotion::Happy]);

    let stats = tracker.transparency().stats();
    assert!(stats.detector_failures >= 1);
    assert!(stats.no_face_samples >= 1);
    assert!(stats.low_confidence_rejections >= 1);
    assert!(stats.debounced_candidates >= 1);
    assert_eq!(stats.entries_logged, 1);
}

#[tokio::test]
async fn test_inactive_source_discards_in_flight_result() {
    let (feed, source) = ChannelFrameSource::channel();
    feed.set_active(true);
    feed.push(Frame::blank(8, 8));

    let detector = Arc::new(StalledDetector {
        calls: AtomicUsize::new(0),
    });
    let tracker = tracker(MemoryBackend::new());
    let handle = tokio::spawn(sampling_loop(
        detector.clone(),
        Arc::new(source),
        tracker.clone(),
        SamplingSettings {
            interval: Duration::from_millis(5),
            detector_timeout: Duration::from_secs(10),
        },
        CancellationToken::new(),
    ));

    // Let the first call start, then turn the camera off
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.set_active(false);

    let reason = tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .expect("loop stops within an interval or so")
        .unwrap();
    assert_eq!(reason, StopReason::SourceInactive);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    assert!(tracker.entries().is_empty());
    assert!(tracker.current().is_none());
}

#[tokio::test]
async fn test_cancel_abandons_in_flight_call() {
    let (feed, source) = ChannelFrameSource::channel();
    feed.set_active(true);
    feed.push(Frame::blank(8, 8));

    let tracker = tracker(MemoryBackend::new());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(sampling_loop(
        Arc::new(StalledDetector {
            calls: AtomicUsize::new(0),
        }),
        Arc::new(source),
        tracker.clone(),
        SamplingSettings {
            interval: Duration::from_millis(5),
            detector_timeout: Duration::from_secs(10),
        },
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let reason = tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .expect("loop stops promptly")
        .unwrap();
    assert_eq!(reason, StopReason::Cancelled);
    assert!(tracker.entries().is_empty());
}

#[tokio::test]
async fn test_detector_timeout_counts_as_failure() {
    let (feed, source) = ChannelFrameSource::channel();
    feed.set_active(true);
    feed.push(Frame::blank(8, 8));

    let tracker = tracker(MemoryBackend::new());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(sampling_loop(
        Arc::new(StalledDetector {
            calls: AtomicUsize::new(0),
        }),
        Arc::new(source),
        tracker.clone(),
        settings(),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    handle.await.unwrap();

    let stats = tracker.transparency().stats();
    assert!(stats.detector_failures >= 2, "loop keeps going after a timeout");
    assert_eq!(stats.entries_logged, 0);
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("emotion-tracker-pipeline-{}", uuid::Uuid::new_v4()));
    let zone = LocalZone::Named(chrono_tz::UTC);
    let t = Utc.with_ymd_and_hms(2024, 2, 10, 22, 15, 0).unwrap();

    let a = EmotionLogEntry::new(Emotion::Happy, 0.9, t, &zone);
    let b = EmotionLogEntry::new(Emotion::Sad, 0.7, t + ChronoDuration::minutes(1), &zone);
    {
        let store = EmotionLogStore::open(Arc::new(FileBackend::new(&dir, STORAGE_KEY)));
        store.append(vec![a.clone(), b.clone()]).unwrap();
    }

    let reopened = EmotionLogStore::open(Arc::new(FileBackend::new(&dir, STORAGE_KEY)));
    assert_eq!(reopened.entries(), vec![a, b]);
    assert!(reopened
        .entries()
        .iter()
        .all(|e| e.time_of_day == TimeOfDay::Night));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_stats_over_mixed_log() {
    let zone = LocalZone::Named(chrono_tz::UTC);
    let now = Utc::now();
    let log = vec![
        EmotionLogEntry::new(Emotion::Happy, 0.9, now - ChronoDuration::hours(25), &zone),
        EmotionLogEntry::new(Emotion::Happy, 0.8, now - ChronoDuration::hours(1), &zone),
        EmotionLogEntry::new(Emotion::Sad, 0.7, now - ChronoDuration::minutes(5), &zone),
    ];

    let stats = compute_stats(&log);
    assert_eq!(stats.total_emotions, 3);
    assert_eq!(stats.most_common_emotion, Emotion::Happy);
    assert!((stats.average_confidence - 0.8).abs() < 1e-9);
    assert_eq!(stats, compute_stats(&log));

    let recent = recent_entries(&log, 24.0, now);
    assert_eq!(recent, log[1..].to_vec());
}
