//! Demonstration of the emotion tracking pipeline.
//!
//! This example shows how to:
//! 1. Replay recorded detector samples through the sampling loop
//! 2. Gate and log emotions into an in-memory store
//! 3. Keep a second view of the same store in sync
//! 4. Compute statistics from the log
//!
//! Run with: cargo run --example replay_demo

use std::sync::Arc;
use std::time::Duration;

use emotion_tracker::{
    core::{GatePolicy, LocalZone, SamplingController, SamplingSettings},
    detector::{ChannelFrameSource, Frame, ReplayDetector},
    store::{ChangeNotifier, EmotionLogStore, MemoryBackend},
    EmotionTracker, PRIVACY_DECLARATION,
};
use tokio_util::sync::CancellationToken;

const SESSION: &str = include_str!("sample_session.jsonl");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Emotion Tracker - Replay Demo");
    println!("=============================");
    println!();
    println!("{PRIVACY_DECLARATION}");

    // Two views over the same storage, as if two windows were open
    let backend = MemoryBackend::new();
    let notifier = ChangeNotifier::new();
    let policy = GatePolicy {
        debounce: chrono::Duration::milliseconds(400),
        ..GatePolicy::default()
    };

    let capture_view = Arc::new(EmotionTracker::new(
        EmotionLogStore::with_notifier(Arc::new(backend.clone()), notifier.clone()),
        policy,
        LocalZone::System,
    ));
    let stats_view = Arc::new(EmotionTracker::new(
        EmotionLogStore::with_notifier(Arc::new(backend), notifier),
        policy,
        LocalZone::System,
    ));

    let cancel = CancellationToken::new();
    let sync = tokio::spawn({
        let view = stats_view.clone();
        let cancel = cancel.clone();
        async move { view.run_sync(cancel).await }
    });

    let detector = Arc::new(ReplayDetector::parse(SESSION)?);
    println!("Replaying {} recorded samples...", detector.len());

    let (feed, source) = ChannelFrameSource::channel();
    feed.set_active(true);
    feed.push(Frame::blank(640, 480));

    let mut controller = SamplingController::new();
    controller.start(
        detector,
        Arc::new(source),
        capture_view.clone(),
        SamplingSettings {
            interval: Duration::from_millis(50),
            ..SamplingSettings::default()
        },
    )?;

    tokio::time::sleep(Duration::from_secs(3)).await;

    // Turning the camera off stops the loop within one tick
    feed.set_active(false);
    let reason = controller.stop().await?;
    println!("Sampling stopped: {reason:?}");

    // Give the second view a moment to reload
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    sync.await?;

    println!();
    println!("Logged entries (seen from the second view):");
    for entry in stats_view.entries() {
        println!(
            "  {}  {:<10} {:>3.0}%  {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.emotion.as_str(),
            entry.confidence * 100.0,
            entry.time_of_day
        );
    }

    let stats = stats_view.stats();
    println!();
    println!("Total: {}", stats.total_emotions);
    println!("Most common: {}", stats.most_common_emotion);
    println!("Average confidence: {:.2}", stats.average_confidence);
    for share in stats.distribution() {
        println!("  {:<10} {:>5.1}%", share.emotion.as_str(), share.percentage);
    }

    println!();
    println!("{}", capture_view.transparency().summary());

    Ok(())
}
