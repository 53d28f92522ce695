//! Placeholder detector used when no classifier backend is wired in.
//!
//! It never reports ready, so the sampling loop refuses to run with it.

use crate::detector::types::{DetectionSample, Frame};
use crate::detector::{DetectorError, ExpressionDetector};
use std::future::Future;

/// A detector that is never ready and never detects anything.
#[derive(Debug, Default, Clone)]
pub struct NoopDetector;

impl NoopDetector {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionDetector for NoopDetector {
    fn is_ready(&self) -> bool {
        false
    }

    fn classify(
        &self,
        _frame: &Frame,
    ) -> impl Future<Output = Result<DetectionSample, DetectorError>> + Send {
        async { Err(DetectorError::NotReady) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_is_never_ready() {
        let detector = NoopDetector::new();
        assert!(!detector.is_ready());
        assert!(matches!(
            detector.classify(&Frame::blank(1, 1)).await,
            Err(DetectorError::NotReady)
        ));
    }
}
