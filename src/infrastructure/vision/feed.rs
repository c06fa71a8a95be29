//! Vision feed port
//!
//! The inference peripheral pushes frames; the game loop owns the receiving
//! end plus a control handle. Pause has *drop* semantics: frames pushed
//! while paused (or while the channel is full) are discarded and counted,
//! never buffered for catch-up. A frame delivered after a pause therefore
//! can never alias the frozen frame of the running cycle.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::value_objects::detection::Frame;

struct FeedShared {
    paused: AtomicBool,
    target_fps: AtomicU32,
    frames_pushed: AtomicU64,
    frames_dropped: AtomicU64,
    tx: mpsc::Sender<Frame>,
}

/// Producer-side handle; cheap to clone across peripherals.
#[derive(Clone)]
pub struct VisionFeed {
    shared: Arc<FeedShared>,
}

impl VisionFeed {
    /// Create the feed and its single consumer.
    pub fn channel(capacity: usize) -> (VisionFeed, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let feed = VisionFeed {
            shared: Arc::new(FeedShared {
                paused: AtomicBool::new(false),
                target_fps: AtomicU32::new(5),
                frames_pushed: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
                tx,
            }),
        };
        (feed, rx)
    }

    /// Offer a frame. Returns false when the frame was dropped (paused
    /// feed, full channel, or consumer gone).
    pub fn push(&self, frame: Frame) -> bool {
        self.shared.frames_pushed.fetch_add(1, Ordering::Relaxed);

        if self.shared.paused.load(Ordering::Acquire) {
            self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.shared.tx.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Rate hint for the capture peripheral; it polls this between frames.
    pub fn set_rate(&self, fps: u32) {
        self.shared.target_fps.store(fps, Ordering::Relaxed);
    }

    pub fn rate(&self) -> u32 {
        self.shared.target_fps.load(Ordering::Relaxed)
    }

    pub fn frames_pushed(&self) -> u64 {
        self.shared.frames_pushed.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.shared.frames_dropped.load(Ordering::Relaxed)
    }
}
