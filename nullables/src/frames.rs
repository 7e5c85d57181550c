//! Nullable frame source: a camera that is always (or eventually) ready.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kiosk_types::{Frame, FrameSource};

/// JPEG start-of-image marker; enough for anything that sniffs the format.
const SOI: [u8; 2] = [0xFF, 0xD8];

/// A frame source with a scripted warm-up.
///
/// The first `warm_up` captures return `None`, every later one returns a tiny
/// JPEG-looking frame. Clones share their counters, so a test can keep one
/// clone while the driver owns the other.
#[derive(Clone, Debug, Default)]
pub struct NullFrameSource {
    warm_up: usize,
    attempts: Arc<AtomicUsize>,
}

impl NullFrameSource {
    pub fn ready() -> Self {
        Self::default()
    }

    /// Not ready for the first `captures` calls.
    pub fn warming_up(captures: usize) -> Self {
        Self {
            warm_up: captures,
            ..Self::default()
        }
    }

    /// Number of capture calls, ready or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of frames actually produced.
    pub fn produced(&self) -> usize {
        self.attempts().saturating_sub(self.warm_up)
    }
}

impl FrameSource for NullFrameSource {
    fn capture(&mut self) -> Option<Frame> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.warm_up {
            return None;
        }
        let mut bytes = SOI.to_vec();
        bytes.extend_from_slice(&(attempt as u64).to_be_bytes());
        Some(Frame::jpeg(bytes))
    }
}
