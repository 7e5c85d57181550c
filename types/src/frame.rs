//! Captured still frames and the source that produces them.

/// One encoded still image (JPEG) sampled from the live feed.
///
/// Created per tick and dropped once the submission round-trip completes.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    jpeg: Vec<u8>,
}

impl Frame {
    pub fn jpeg(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            jpeg: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.jpeg
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({} bytes)", self.jpeg.len())
    }
}

/// Produces periodic still frames from a live video feed.
///
/// Returning `None` means the source is not ready yet (camera warming up); the
/// capture loop skips that tick rather than treating it as a failure.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Frame>;
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn capture(&mut self) -> Option<Frame> {
        (**self).capture()
    }
}
