//! Video container stand-ins

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::{CaptureError, VideoContainer};
use tracing::debug;

/// Container that reports a fixed frame count
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedFrameCountVideo(pub u64);

impl VideoContainer for FixedFrameCountVideo {
    fn frame_count(&self) -> Result<u64, CaptureError> {
        Ok(self.0)
    }
}

/// Encoder that only counts frames
///
/// The count is readable once `finish` has been called, like a real
/// container whose index is written on finalize.
#[derive(Debug, Default)]
pub struct CountingVideoEncoder {
    frames: AtomicU64,
    finished: AtomicBool,
}

impl CountingVideoEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one color frame; ignored after `finish`
    pub fn encode_frame(&self) {
        if !self.finished.load(Ordering::Acquire) {
            self.frames.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn finish(&self) {
        if !self.finished.swap(true, Ordering::AcqRel) {
            debug!(frames = self.frames.load(Ordering::Acquire), "video finalized");
        }
    }
}

impl VideoContainer for CountingVideoEncoder {
    fn frame_count(&self) -> Result<u64, CaptureError> {
        if !self.finished.load(Ordering::Acquire) {
            return Err(CaptureError::video_container("container not finalized"));
        }
        Ok(self.frames.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_after_finish() {
        let encoder = CountingVideoEncoder::new();
        encoder.encode_frame();
        encoder.encode_frame();
        assert!(encoder.frame_count().is_err());

        encoder.finish();
        encoder.encode_frame();
        assert_eq!(encoder.frame_count().unwrap(), 2);
    }
}
