//! Types exchanged with the face/expression detector.
//!
//! A detection sample only lives for the duration of one sampling tick; none
//! of these types are ever persisted except the [`Emotion`] label itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The closed set of emotion labels the tracker understands.
///
/// Declaration order is the canonical order used to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fearful,
    Surprised,
    Disgusted,
    Neutral,
}

impl Emotion {
    /// All labels in canonical order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Surprised,
        Emotion::Disgusted,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Surprised => "surprised",
            Emotion::Disgusted => "disgusted",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a detector label is not one of the known emotions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEmotion(pub String);

impl fmt::Display for UnknownEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emotion label '{}'", self.0)
    }
}

impl std::error::Error for UnknownEmotion {}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            "fearful" | "fear" => Ok(Emotion::Fearful),
            "surprised" | "surprise" => Ok(Emotion::Surprised),
            "disgusted" | "disgust" => Ok(Emotion::Disgusted),
            "neutral" => Ok(Emotion::Neutral),
            _ => Err(UnknownEmotion(s.to_string())),
        }
    }
}

/// Bounding region of a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Per-emotion confidence map for one face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ExpressionScores {
    scores: BTreeMap<Emotion, f64>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence for a label.
    ///
    /// Non-finite values are dropped and the rest are clamped into `[0, 1]`.
    pub fn set(&mut self, emotion: Emotion, confidence: f64) {
        if confidence.is_finite() {
            self.scores.insert(emotion, confidence.clamp(0.0, 1.0));
        } else {
            self.scores.remove(&emotion);
        }
    }

    pub fn with(mut self, emotion: Emotion, confidence: f64) -> Self {
        self.set(emotion, confidence);
        self
    }

    pub fn get(&self, emotion: Emotion) -> Option<f64> {
        self.scores.get(&emotion).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The label with the highest confidence.
    ///
    /// Ties go to the label that comes first in [`Emotion::ALL`].
    pub fn dominant(&self) -> Option<(Emotion, f64)> {
        let mut best: Option<(Emotion, f64)> = None;
        for emotion in Emotion::ALL {
            if let Some(confidence) = self.get(emotion) {
                match best {
                    Some((_, top)) if confidence <= top => {}
                    _ => best = Some((emotion, confidence)),
                }
            }
        }
        best
    }
}

impl From<BTreeMap<String, f64>> for ExpressionScores {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let mut scores = ExpressionScores::new();
        for (label, confidence) in raw {
            // Labels outside the closed set are ignored
            if let Ok(emotion) = label.parse::<Emotion>() {
                scores.set(emotion, confidence);
            }
        }
        scores
    }
}

impl From<ExpressionScores> for BTreeMap<String, f64> {
    fn from(scores: ExpressionScores) -> Self {
        scores
            .scores
            .into_iter()
            .map(|(emotion, confidence)| (emotion.as_str().to_string(), confidence))
            .collect()
    }
}

/// One detected face with its expression scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub region: FaceRegion,
    pub expressions: ExpressionScores,
}

/// Detector output for a single frame. Zero or more faces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSample {
    #[serde(default)]
    pub faces: Vec<FaceDetection>,
}

impl DetectionSample {
    pub fn no_face() -> Self {
        Self::default()
    }

    pub fn single(region: FaceRegion, expressions: ExpressionScores) -> Self {
        Self {
            faces: vec![FaceDetection {
                region,
                expressions,
            }],
        }
    }

    /// The face that is analysed: the first one reported.
    pub fn primary_face(&self) -> Option<&FaceDetection> {
        self.faces.first()
    }
}

/// A video frame pulled from the capture source.
///
/// The pixel buffer is shared so handing a frame to the detector never copies it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            captured_at: Utc::now(),
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// A frame with no pixel data, for detectors that don't look at pixels.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, Vec::new())
    }
}
