//! Emotion Tracker - local, privacy-first emotion journaling from a camera feed.
//!
//! This library turns a noisy stream of per-frame expression classifications
//! into a small, durable log of emotion entries, keeps that log consistent
//! across every open view of it, and derives statistics from it.
//!
//! # Privacy Guarantees
//!
//! - **No frames stored**: Video frames are classified and dropped immediately
//! - **No face data stored**: Face positions are only used for the live reading
//! - **Derived labels only**: An entry is an emotion, a confidence and a time
//! - **Transparency**: Every processed and discarded sample is counted
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Emotion Tracker                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Sampling   │──▶│   Logging   │──▶│  Log Store  │──┐      │
//! │  │ Loop (10Hz) │   │    Gate     │   │  (durable)  │  │      │
//! │  └─────────────┘   └─────────────┘   └─────────────┘  │      │
//! │         │                                   │         │      │
//! │         ▼                                   ▼         ▼      │
//! │  ┌─────────────┐                    ┌───────────┐ ┌────────┐ │
//! │  │Transparency │                    │   Stats   │ │ Change │ │
//! │  │    Log      │                    │ Aggregator│ │ Notify │ │
//! │  └─────────────┘                    └───────────┘ └────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use emotion_tracker::{Config, EmotionTracker};
//!
//! let config = Config::load().unwrap_or_default();
//! let tracker = EmotionTracker::from_config(&config);
//!
//! let stats = tracker.stats();
//! println!("{} emotions logged, mostly {}", stats.total_emotions, stats.most_common_emotion);
//! ```

pub mod config;
pub mod core;
pub mod detector;
pub mod store;
pub mod tracker;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    compute_stats, recent_entries, EmotionLogEntry, EmotionStats, GatePolicy, LocalZone,
    LoggingGate, SamplingController, SamplingSettings, StopReason, TimeOfDay,
};
pub use detector::{
    ChannelFrameSource, DetectionSample, DetectorError, Emotion, ExpressionDetector,
    ExpressionScores, FrameFeed, FrameSource, NoopDetector, ReplayDetector,
};
pub use store::{ChangeNotifier, EmotionLogStore, FileBackend, MemoryBackend, StoreError};
pub use tracker::{CurrentReading, EmotionTracker, Observation};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              EMOTION TRACKER - PRIVACY DECLARATION               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tracker keeps a private journal of detected emotions.      ║
║                                                                  ║
║  ✓ WHAT WE STORE:                                                ║
║    • The detected emotion label (happy, sad, ...)                ║
║    • How confident the detector was                              ║
║    • When it was detected (and the time-of-day bucket)           ║
║                                                                  ║
║  ✗ WHAT WE NEVER STORE:                                          ║
║    • Video frames or images of your face                         ║
║    • Where your face was in the frame                            ║
║    • Any audio                                                   ║
║                                                                  ║
║  All processing is local. Nothing leaves this machine.           ║
║  Frames are discarded as soon as they are classified.            ║
║                                                                  ║
║  You can view or erase your history anytime with:                ║
║    emotion-tracker status                                        ║
║    emotion-tracker clear                                         ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
