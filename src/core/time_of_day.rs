//! Time-of-day bucketing.
//!
//! The bucket is computed from the local wall-clock hour when an entry is
//! created and stored with it, so historical entries never move buckets.

use chrono::{DateTime, Local, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of four fixed daily periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 05:00 - 11:59
    Morning,
    /// 12:00 - 16:59
    Afternoon,
    /// 17:00 - 20:59
    Evening,
    /// 21:00 - 04:59
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Bucket for a wall-clock hour. Boundary hours belong to the later bucket.
    ///
    /// Hours outside `0..24` are reduced modulo 24.
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The zone whose wall clock decides the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// The operating system's local timezone.
    #[default]
    System,
    /// An explicit IANA timezone.
    Named(Tz),
}

impl LocalZone {
    /// Wall-clock hour of `timestamp` in this zone.
    pub fn hour_of(&self, timestamp: DateTime<Utc>) -> u32 {
        match self {
            LocalZone::System => timestamp.with_timezone(&Local).hour(),
            LocalZone::Named(tz) => timestamp.with_timezone(tz).hour(),
        }
    }

    /// Classify a timestamp.
    pub fn classify(&self, timestamp: DateTime<Utc>) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour_of(timestamp))
    }
}
