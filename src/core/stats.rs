//! Summary statistics over the emotion log.
//!
//! Everything here is a pure function of the entries passed in. Stats are
//! recomputed on every query and never persisted.

use crate::core::entry::EmotionLogEntry;
use crate::core::time_of_day::TimeOfDay;
use crate::detector::types::Emotion;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Default window for recent entries, in hours.
pub const DEFAULT_RECENT_WINDOW_HOURS: f64 = 24.0;

/// Default number of entries shown as recent activity.
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 10;

/// Aggregate view of a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionStats {
    pub total_emotions: usize,
    /// Highest count; ties go to the emotion that appeared first in the log
    pub most_common_emotion: Emotion,
    pub average_confidence: f64,
    /// Only emotions actually observed
    pub emotion_counts: BTreeMap<Emotion, usize>,
    pub time_patterns: BTreeMap<TimeOfDay, usize>,
    /// Observed emotions in order of first appearance
    #[serde(skip)]
    first_seen: Vec<Emotion>,
}

impl Default for EmotionStats {
    fn default() -> Self {
        Self {
            total_emotions: 0,
            most_common_emotion: Emotion::Neutral,
            average_confidence: 0.0,
            emotion_counts: BTreeMap::new(),
            time_patterns: BTreeMap::new(),
            first_seen: Vec::new(),
        }
    }
}

/// Share of one emotion in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionShare {
    pub emotion: Emotion,
    pub count: usize,
    /// Percentage of all entries, 0-100
    pub percentage: f64,
}

impl EmotionStats {
    /// Emotion counts with their percentage, most frequent first.
    ///
    /// Ties follow the same rule as `most_common_emotion`.
    pub fn distribution(&self) -> Vec<EmotionShare> {
        if self.total_emotions == 0 {
            return Vec::new();
        }

        // Deserialized stats carry no appearance order; use canonical order
        let order: Vec<Emotion> = if self.first_seen.len() == self.emotion_counts.len() {
            self.first_seen.clone()
        } else {
            self.emotion_counts.keys().copied().collect()
        };

        let mut shares: Vec<EmotionShare> = order
            .into_iter()
            .map(|emotion| {
                let count = self.emotion_counts.get(&emotion).copied().unwrap_or(0);
                EmotionShare {
                    emotion,
                    count,
                    percentage: count as f64 / self.total_emotions as f64 * 100.0,
                }
            })
            .collect();

        // Stable sort keeps ties in appearance order
        shares.sort_by(|a, b| b.count.cmp(&a.count));
        shares
    }
}

/// Compute stats for a log. An empty log yields [`EmotionStats::default`].
pub fn compute_stats(entries: &[EmotionLogEntry]) -> EmotionStats {
    if entries.is_empty() {
        return EmotionStats::default();
    }

    let mut emotion_counts: BTreeMap<Emotion, usize> = BTreeMap::new();
    let mut time_patterns: BTreeMap<TimeOfDay, usize> = BTreeMap::new();
    let mut first_seen: Vec<Emotion> = Vec::new();
    let mut confidences: Vec<f64> = Vec::with_capacity(entries.len());

    for entry in entries {
        let count = emotion_counts.entry(entry.emotion).or_insert(0);
        if *count == 0 {
            first_seen.push(entry.emotion);
        }
        *count += 1;
        *time_patterns.entry(entry.time_of_day).or_insert(0) += 1;
        confidences.push(entry.confidence);
    }

    let mut most_common_emotion = Emotion::Neutral;
    let mut best_count = 0;
    for emotion in &first_seen {
        let count = emotion_counts.get(emotion).copied().unwrap_or(0);
        if count > best_count {
            best_count = count;
            most_common_emotion = *emotion;
        }
    }

    EmotionStats {
        total_emotions: entries.len(),
        most_common_emotion,
        average_confidence: confidences.iter().mean(),
        emotion_counts,
        time_patterns,
        first_seen,
    }
}

/// Entries strictly newer than `now - window_hours`, in log order.
///
/// A NaN or negative window selects nothing. A window reaching past the
/// earliest representable time selects everything.
pub fn recent_entries(
    entries: &[EmotionLogEntry],
    window_hours: f64,
    now: DateTime<Utc>,
) -> Vec<EmotionLogEntry> {
    if window_hours.is_nan() || window_hours < 0.0 {
        return Vec::new();
    }

    let cutoff = Duration::try_milliseconds((window_hours * 3_600_000.0) as i64)
        .and_then(|window| now.checked_sub_signed(window));
    entries
        .iter()
        .filter(|entry| cutoff.map_or(true, |cutoff| entry.timestamp > cutoff))
        .cloned()
        .collect()
}

/// The last `limit` entries of the recent window, newest first.
pub fn recent_activity(
    entries: &[EmotionLogEntry],
    window_hours: f64,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<EmotionLogEntry> {
    let mut recent = recent_entries(entries, window_hours, now);
    recent.reverse();
    recent.truncate(limit);
    recent
}
