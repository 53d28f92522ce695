//! Detection sampling loop.
//!
//! Polls the detector for the current frame at a fixed cadence and feeds
//! each sample to the tracker. The loop only runs while the detector is
//! ready and the capture source is active, and it never builds a backlog:
//! a tick that overruns simply skips the ticks it missed.

use crate::detector::{ExpressionDetector, FrameSource};
use crate::tracker::EmotionTracker;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default sampling interval (10 samples per second).
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

/// Default upper bound for a single detector call.
pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 1000;

/// Timing for the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingSettings {
    pub interval: Duration,
    pub detector_timeout: Duration,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            detector_timeout: Duration::from_millis(DEFAULT_DETECTOR_TIMEOUT_MS),
        }
    }
}

/// Why the sampling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DetectorNotReady,
    SourceInactive,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::DetectorNotReady => write!(f, "detector not ready"),
            StopReason::SourceInactive => write!(f, "capture source inactive"),
        }
    }
}

/// Run the sampling loop until cancelled or until the detector or source
/// stops being usable.
///
/// A detector result that arrives after cancellation, or after the source
/// went inactive, is discarded without touching the tracker.
pub async fn sampling_loop<D, S>(
    detector: Arc<D>,
    source: Arc<S>,
    tracker: Arc<EmotionTracker>,
    settings: SamplingSettings,
    cancel: CancellationToken,
) -> StopReason
where
    D: ExpressionDetector,
    S: FrameSource,
{
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break StopReason::Cancelled,
            _ = ticker.tick() => {}
        }

        if !detector.is_ready() {
            break StopReason::DetectorNotReady;
        }
        if !source.is_active() {
            break StopReason::SourceInactive;
        }

        let Some(frame) = source.current_frame() else {
            debug!("No frame available yet");
            continue;
        };
        tracker.transparency().record_frame_sampled();

        let result = tokio::select! {
            _ = cancel.cancelled() => break StopReason::Cancelled,
            reason = wait_until_unusable(&*detector, &*source, settings.interval) => break reason,
            result = tokio::time::timeout(settings.detector_timeout, detector.classify(&frame)) => result,
        };

        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if !source.is_active() {
            break StopReason::SourceInactive;
        }

        match result {
            Ok(Ok(sample)) => {
                // Persisting an entry touches the disk
                let observer = tracker.clone();
                let observed =
                    tokio::task::spawn_blocking(move || observer.observe(&sample, Utc::now()))
                        .await;
                if let Err(e) = observed {
                    warn!("Observation task failed: {e}");
                }
            }
            Ok(Err(e)) => {
                tracker.transparency().record_detector_failure();
                warn!("Dropping sample, detector failed: {e}");
            }
            Err(_) => {
                tracker.transparency().record_detector_failure();
                warn!(
                    "Dropping sample, detector timed out after {}ms",
                    settings.detector_timeout.as_millis()
                );
            }
        }
    };

    tracker.clear_current();
    info!("Sampling loop stopped: {reason}");
    reason
}

/// Resolves once the detector or source stops being usable, checking once
/// per interval. Used to abandon an in-flight detector call.
async fn wait_until_unusable<D, S>(detector: &D, source: &S, interval: Duration) -> StopReason
where
    D: ExpressionDetector,
    S: FrameSource,
{
    loop {
        tokio::time::sleep(interval).await;
        if !detector.is_ready() {
            return StopReason::DetectorNotReady;
        }
        if !source.is_active() {
            return StopReason::SourceInactive;
        }
    }
}

/// Sampling controller errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingError {
    AlreadyRunning,
    Join(String),
}

impl std::fmt::Display for SamplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingError::AlreadyRunning => write!(f, "Sampling already active"),
            SamplingError::Join(e) => write!(f, "Sampling task failed to join: {e}"),
        }
    }
}

impl std::error::Error for SamplingError {}

/// Starts and stops the sampling loop as a background task.
#[derive(Debug, Default)]
pub struct SamplingController {
    handle: Option<JoinHandle<StopReason>>,
    cancel: Option<CancellationToken>,
}

impl SamplingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the loop. Must be called from within a tokio runtime.
    pub fn start<D, S>(
        &mut self,
        detector: Arc<D>,
        source: Arc<S>,
        tracker: Arc<EmotionTracker>,
        settings: SamplingSettings,
    ) -> Result<(), SamplingError>
    where
        D: ExpressionDetector,
        S: FrameSource,
    {
        if self.is_running() {
            return Err(SamplingError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            detector,
            source,
            tracker,
            settings,
            cancel.clone(),
        ));

        self.handle = Some(handle);
        self.cancel = Some(cancel);
        debug!("Sampling started ({}ms interval)", settings.interval.as_millis());
        Ok(())
    }

    /// Whether the loop task is still alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancel the loop and wait for it to finish.
    ///
    /// Returns the reason the loop ended, or `None` if it was never started.
    pub async fn stop(&mut self) -> Result<Option<StopReason>, SamplingError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map(Some)
                .map_err(|e| SamplingError::Join(e.to_string())),
            None => Ok(None),
        }
    }
}
