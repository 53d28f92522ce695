//! Frame sources fed by a capture thread.
//!
//! Camera acquisition happens elsewhere; it pushes frames through a
//! [`FrameFeed`]. The sampling loop only ever sees the latest frame, so a
//! slow detector never builds up a backlog of stale frames.

use crate::detector::types::Frame;
use crate::detector::FrameSource;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Capacity of the frame channel. Older frames are dropped when it fills up.
const FRAME_CHANNEL_CAPACITY: usize = 4;

/// Producer side, owned by the capture thread.
#[derive(Clone)]
pub struct FrameFeed {
    sender: Sender<Frame>,
    receiver: Receiver<Frame>,
    active: Arc<AtomicBool>,
}

impl FrameFeed {
    /// Push a frame. If the channel is full the oldest frame is discarded.
    pub fn push(&self, frame: Frame) {
        let mut frame = frame;
        loop {
            match self.sender.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.receiver.try_recv();
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Mark the capture source as active or inactive.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Consumer side, handed to the sampling loop.
pub struct ChannelFrameSource {
    receiver: Receiver<Frame>,
    active: Arc<AtomicBool>,
    latest: Mutex<Option<Frame>>,
}

impl ChannelFrameSource {
    /// Create a connected feed/source pair. The source starts inactive.
    pub fn channel() -> (FrameFeed, ChannelFrameSource) {
        let (sender, receiver) = bounded(FRAME_CHANNEL_CAPACITY);
        let active = Arc::new(AtomicBool::new(false));

        let feed = FrameFeed {
            sender,
            receiver: receiver.clone(),
            active: active.clone(),
        };
        let source = ChannelFrameSource {
            receiver,
            active,
            latest: Mutex::new(None),
        };
        (feed, source)
    }
}

impl FrameSource for ChannelFrameSource {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn current_frame(&self) -> Option<Frame> {
        let mut latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drain everything queued and keep only the newest
        while let Ok(frame) = self.receiver.try_recv() {
            *latest = Some(frame);
        }

        latest.clone()
    }
}
