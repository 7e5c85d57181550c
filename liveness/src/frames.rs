//! Directory-backed frame source.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use kiosk_types::{Frame, FrameSource};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Serves the JPEG files of a directory in name order, over and over.
///
/// Stands in for camera capture on a kiosk without a live feed: whatever the
/// capture process last wrote is picked up on the next pass. An empty or
/// missing directory reads as "not ready yet".
///
/// Reads are blocking. On a multi-threaded runtime they run under
/// [`tokio::task::block_in_place`] so the capture loop's worker hands its
/// other tasks off first; elsewhere they run inline.
#[derive(Debug)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: VecDeque::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rescan(&mut self) -> io::Result<()> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && is_jpeg(&path) {
                files.push(path);
            }
        }
        files.sort();
        self.pending = files.into();
        Ok(())
    }
}

fn off_reactor<T>(read: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(read)
        }
        _ => read(),
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

impl FrameSource for DirectoryFrameSource {
    fn capture(&mut self) -> Option<Frame> {
        off_reactor(|| self.capture_blocking())
    }
}

impl DirectoryFrameSource {
    fn capture_blocking(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            if let Err(e) = self.rescan() {
                tracing::debug!(dir = %self.dir.display(), error = %e, "frame directory unavailable");
                return None;
            }
        }

        let path = self.pending.pop_front()?;
        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Some(Frame::jpeg(bytes)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read frame");
                None
            }
        }
    }
}
