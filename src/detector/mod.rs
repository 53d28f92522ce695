//! Boundary with the face/expression classifier and the capture source.
//!
//! The tracker never loads models or touches a camera itself. It consumes
//! two collaborators:
//!
//! - an [`ExpressionDetector`] that classifies the current frame, and
//! - a [`FrameSource`] that reports whether capture is active and yields the
//!   latest frame.

pub mod noop;
pub mod replay;
pub mod source;
pub mod types;

use std::future::Future;

pub use noop::NoopDetector;
pub use replay::ReplayDetector;
pub use source::{ChannelFrameSource, FrameFeed};
pub use types::{
    DetectionSample, Emotion, ExpressionScores, FaceDetection, FaceRegion, Frame, UnknownEmotion,
};

/// An asynchronous face/expression classifier.
pub trait ExpressionDetector: Send + Sync + 'static {
    /// Whether the underlying model is loaded and able to classify.
    fn is_ready(&self) -> bool;

    /// Classify one frame.
    ///
    /// A failure here only affects the current sample.
    fn classify(
        &self,
        frame: &Frame,
    ) -> impl Future<Output = Result<DetectionSample, DetectorError>> + Send;
}

/// Provider of video frames.
pub trait FrameSource: Send + Sync + 'static {
    /// Whether the capture source is currently producing frames.
    fn is_active(&self) -> bool;

    /// The most recent frame, if one is available.
    fn current_frame(&self) -> Option<Frame>;
}

/// Errors raised by a detector for a single sample.
#[derive(Debug)]
pub enum DetectorError {
    NotReady,
    Inference(String),
    Timeout,
    Replay(String),
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::NotReady => write!(f, "Detector model is not ready"),
            DetectorError::Inference(e) => write!(f, "Inference error: {e}"),
            DetectorError::Timeout => write!(f, "Detector call timed out"),
            DetectorError::Replay(e) => write!(f, "Replay error: {e}"),
        }
    }
}

impl std::error::Error for DetectorError {}
