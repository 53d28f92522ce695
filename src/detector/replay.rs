//! Replay detector backed by recorded detection samples.
//!
//! Each line of a replay file is one JSON object, either a sample:
//!
//! ```text
//! {"faces": [{"region": {"x": 10, "y": 20, "width": 80, "height": 80},
//!             "expressions": {"happy": 0.91, "neutral": 0.05}}]}
//! ```
//!
//! or a simulated inference failure: `{"error": "model crashed"}`.
//! Samples are replayed in order and wrap around at the end.

use crate::detector::types::{DetectionSample, Frame};
use crate::detector::{DetectorError, ExpressionDetector};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ReplayStep {
    Failure { error: String },
    Sample(DetectionSample),
}

/// A detector that replays a fixed sequence of samples.
#[derive(Debug)]
pub struct ReplayDetector {
    steps: Vec<ReplayStep>,
    cursor: AtomicUsize,
    ready: AtomicBool,
}

impl ReplayDetector {
    /// Build a detector from in-memory samples.
    pub fn from_samples(samples: Vec<DetectionSample>) -> Self {
        Self::from_steps(samples.into_iter().map(ReplayStep::Sample).collect())
    }

    /// Load a JSON-lines replay file. Blank lines are skipped.
    pub fn from_path(path: &Path) -> Result<Self, DetectorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DetectorError::Replay(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse JSON-lines replay content.
    pub fn parse(content: &str) -> Result<Self, DetectorError> {
        let mut steps = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let step: ReplayStep = serde_json::from_str(line)
                .map_err(|e| DetectorError::Replay(format!("line {}: {e}", line_no + 1)))?;
            steps.push(step);
        }

        if steps.is_empty() {
            return Err(DetectorError::Replay("replay contains no samples".to_string()));
        }

        Ok(Self::from_steps(steps))
    }

    fn from_steps(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps,
            cursor: AtomicUsize::new(0),
            ready: AtomicBool::new(true),
        }
    }

    /// Toggle model readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn next_step(&self) -> Option<ReplayStep> {
        if self.steps.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.steps.len();
        self.steps.get(index).cloned()
    }
}

impl ExpressionDetector for ReplayDetector {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn classify(
        &self,
        _frame: &Frame,
    ) -> impl Future<Output = Result<DetectionSample, DetectorError>> + Send {
        let result = if !self.is_ready() {
            Err(DetectorError::NotReady)
        } else {
            match self.next_step() {
                Some(ReplayStep::Sample(sample)) => Ok(sample),
                Some(ReplayStep::Failure { error }) => Err(DetectorError::Inference(error)),
                None => Ok(DetectionSample::no_face()),
            }
        };
        async move { result }
    }
}
