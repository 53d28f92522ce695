//! The persisted emotion log entry.

use crate::core::time_of_day::{LocalZone, TimeOfDay};
use crate::detector::types::Emotion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One confirmed observation. Entries are never modified after creation.
///
/// Serialized as `{id, emotion, confidence, timestamp, timeOfDay}` with the
/// timestamp in RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionLogEntry {
    /// Opaque unique identifier
    pub id: String,
    pub emotion: Emotion,
    /// Detector confidence in `[0, 1]`
    pub confidence: f64,
    /// Capture time of the observation
    pub timestamp: DateTime<Utc>,
    /// Bucket computed at creation time
    #[serde(rename = "timeOfDay")]
    pub time_of_day: TimeOfDay,
}

impl EmotionLogEntry {
    /// Create an entry, bucketing the timestamp in the given zone.
    pub fn new(
        emotion: Emotion,
        confidence: f64,
        timestamp: DateTime<Utc>,
        zone: &LocalZone,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            emotion,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
            time_of_day: zone.classify(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 18, 5, 0).unwrap();
        let entry = EmotionLogEntry::new(
            Emotion::Happy,
            0.87,
            ts,
            &LocalZone::Named(chrono_tz::UTC),
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["emotion"], "happy");
        assert_eq!(value["timeOfDay"], "evening");
        assert_eq!(value["timestamp"], "2024-03-01T18:05:00Z");
        assert!(value["id"].as_str().is_some());

        let parsed: EmotionLogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_ids_are_unique() {
        let zone = LocalZone::Named(chrono_tz::UTC);
        let now = Utc::now();
        let a = EmotionLogEntry::new(Emotion::Sad, 0.7, now, &zone);
        let b = EmotionLogEntry::new(Emotion::Sad, 0.7, now, &zone);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_legacy_entry_parses() {
        let json = r#"{"id":"1700000000000-0.42","emotion":"sad","confidence":0.65,
                       "timestamp":"2023-11-14T22:13:20.000Z","timeOfDay":"night"}"#;
        let entry: EmotionLogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.emotion, Emotion::Sad);
        assert_eq!(entry.time_of_day, TimeOfDay::Night);
    }
}
