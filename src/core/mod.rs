//! Core pipeline for the emotion tracker.
//!
//! This module contains:
//! - Time-of-day bucketing for entries
//! - The log entry type
//! - The logging gate (confidence threshold and debounce)
//! - The detection sampling loop
//! - Statistics over the stored log

pub mod entry;
pub mod gate;
pub mod sampler;
pub mod stats;
pub mod time_of_day;

// Re-export commonly used types
pub use entry::EmotionLogEntry;
pub use gate::{GateOutcome, GatePolicy, LoggingGate, Rejection};
pub use sampler::{
    sampling_loop, SamplingController, SamplingError, SamplingSettings, StopReason,
};
pub use stats::{
    compute_stats, recent_activity, recent_entries, EmotionShare, EmotionStats,
    DEFAULT_RECENT_ACTIVITY_LIMIT, DEFAULT_RECENT_WINDOW_HOURS,
};
pub use time_of_day::{LocalZone, TimeOfDay};
