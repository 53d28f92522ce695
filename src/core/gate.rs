//! Logging gate: decides which detections become log entries.
//!
//! A candidate is logged when its confidence is strictly above the threshold
//! and either the emotion changed since the last logged entry or the debounce
//! window has strictly elapsed. Without this, a steady face would produce an
//! entry on every sampling tick.

use crate::core::entry::EmotionLogEntry;
use crate::core::time_of_day::LocalZone;
use crate::detector::types::Emotion;
use chrono::{DateTime, Duration, Utc};

/// Default minimum confidence (exclusive).
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

/// Default debounce window in milliseconds (exclusive).
pub const DEFAULT_DEBOUNCE_MS: i64 = 5000;

/// Thresholds applied by the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatePolicy {
    pub min_confidence: f64,
    pub debounce: Duration,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
        }
    }
}

/// Why a candidate was not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Confidence at or below the threshold
    LowConfidence,
    /// Same emotion as the last entry, inside the debounce window
    Debounced,
}

/// Result of offering a candidate to the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Accepted(EmotionLogEntry),
    Rejected(Rejection),
}

/// Stateful gate. State only changes when a candidate is accepted.
#[derive(Debug, Clone)]
pub struct LoggingGate {
    policy: GatePolicy,
    zone: LocalZone,
    last_accepted: Option<(Emotion, DateTime<Utc>)>,
}

impl LoggingGate {
    pub fn new(policy: GatePolicy, zone: LocalZone) -> Self {
        Self {
            policy,
            zone,
            last_accepted: None,
        }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// The last accepted emotion and when it was accepted.
    pub fn last_accepted(&self) -> Option<(Emotion, DateTime<Utc>)> {
        self.last_accepted
    }

    /// Evaluate a candidate without changing state.
    pub fn check(&self, emotion: Emotion, confidence: f64, now: DateTime<Utc>) -> Option<Rejection> {
        if confidence.is_nan() || confidence <= self.policy.min_confidence {
            return Some(Rejection::LowConfidence);
        }

        match self.last_accepted {
            Some((last_emotion, last_time))
                if last_emotion == emotion && now - last_time <= self.policy.debounce =>
            {
                Some(Rejection::Debounced)
            }
            _ => None,
        }
    }

    /// Offer a candidate observed at `now`.
    ///
    /// On acceptance the entry is stamped with `now`, its time-of-day bucket
    /// is fixed, and the gate remembers it.
    pub fn consider(&mut self, emotion: Emotion, confidence: f64, now: DateTime<Utc>) -> GateOutcome {
        if let Some(rejection) = self.check(emotion, confidence, now) {
            return GateOutcome::Rejected(rejection);
        }

        self.last_accepted = Some((emotion, now));
        GateOutcome::Accepted(EmotionLogEntry::new(emotion, confidence, now, &self.zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gate() -> LoggingGate {
        LoggingGate::new(GatePolicy::default(), LocalZone::Named(chrono_tz::UTC))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut gate = gate();
        assert_eq!(
            gate.consider(Emotion::Happy, 0.6, t0()),
            GateOutcome::Rejected(Rejection::LowConfidence)
        );
        assert!(gate.last_accepted().is_none());
        assert!(matches!(
            gate.consider(Emotion::Happy, 0.61, t0()),
            GateOutcome::Accepted(_)
        ));
    }

    #[test]
    fn test_same_emotion_debounced() {
        let mut gate = gate();
        assert!(matches!(gate.consider(Emotion::Happy, 0.9, t0()), GateOutcome::Accepted(_)));

        let at_4999 = t0() + Duration::milliseconds(4999);
        assert_eq!(
            gate.consider(Emotion::Happy, 0.61, at_4999),
            GateOutcome::Rejected(Rejection::Debounced)
        );

        let at_5000 = t0() + Duration::milliseconds(5000);
        assert_eq!(
            gate.consider(Emotion::Happy, 0.61, at_5000),
            GateOutcome::Rejected(Rejection::Debounced)
        );

        let at_5001 = t0() + Duration::milliseconds(5001);
        assert!(matches!(
            gate.consider(Emotion::Happy, 0.61, at_5001),
            GateOutcome::Accepted(_)
        ));
    }

    #[test]
    fn test_rejection_does_not_move_window() {
        let mut gate = gate();
        gate.consider(Emotion::Happy, 0.9, t0());

        // Rejected repeats must not push the debounce window forward
        for ms in [1000, 2000, 3000, 4000] {
            gate.consider(Emotion::Happy, 0.9, t0() + Duration::milliseconds(ms));
        }
        assert_eq!(gate.last_accepted(), Some((Emotion::Happy, t0())));
        assert!(matches!(
            gate.consider(Emotion::Happy, 0.9, t0() + Duration::milliseconds(5001)),
            GateOutcome::Accepted(_)
        ));
    }

    #[test]
    fn test_emotion_change_accepted_immediately() {
        let mut gate = gate();
        gate.consider(Emotion::Happy, 0.9, t0());

        let outcome = gate.consider(Emotion::Sad, 0.7, t0() + Duration::milliseconds(100));
        match outcome {
            GateOutcome::Accepted(entry) => {
                assert_eq!(entry.emotion, Emotion::Sad);
                assert_eq!(entry.timestamp, t0() + Duration::milliseconds(100));
                assert_eq!(entry.time_of_day, crate::core::TimeOfDay::Morning);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn test_low_confidence_change_rejected() {
        let mut gate = gate();
        gate.consider(Emotion::Happy, 0.9, t0());
        assert_eq!(
            gate.consider(Emotion::Angry, 0.3, t0() + Duration::milliseconds(10)),
            GateOutcome::Rejected(Rejection::LowConfidence)
        );
        assert_eq!(gate.last_accepted(), Some((Emotion::Happy, t0())));
    }
}
