//! FrameRecorder - per rendered camera frame
//!
//! Flow: gate -> record -> depth -> latch -> confidence -> depth write -> count
//! -> confidence and camera info writes.
//! Depth and confidence may legitimately be unavailable for a frame; the
//! frame is then skipped as a whole so the three camera streams stay aligned.
//! Nothing is appended before both images are in hand.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{CameraFrame, CaptureError, ConfidenceImage, DepthImage, ImageKind};
use depth_codec::{format_list, repack_depth_image, split_depth_image};
use observability::SkipReason;
use stream_registry::RegistryError;
use tracing::{debug, error, instrument, trace, warn};

use crate::error::RecorderError;
use crate::layout::keys;
use crate::session::{LastFrame, Session};

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session not recording; nothing touched
    NotRecording,
    /// Frame skipped, nothing appended
    Skipped(SkipReason),
    /// Frame written; carries the new frame count
    Recorded(u64),
}

/// Writes camera frames of one session
#[derive(Debug, Clone)]
pub struct FrameRecorder {
    session: Arc<Session>,
}

impl FrameRecorder {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Process one frame from the render thread.
    ///
    /// Only non-transient collaborator failures and writes to unregistered
    /// streams are returned as errors.
    #[instrument(name = "frame_recorder_on_frame", level = "trace", skip_all)]
    pub fn on_frame(&self, frame: &dyn CameraFrame) -> Result<FrameOutcome, RecorderError> {
        let Some(_recording) = self.session.recording_guard() else {
            return Ok(FrameOutcome::NotRecording);
        };

        let record = frame.frame_record();

        let depth = match acquire(frame.acquire_raw_depth_image(), ImageKind::Depth)? {
            Ok(depth) => depth,
            Err(reason) => return Ok(self.skip(record.timestamp, reason)),
        };

        if self
            .session
            .latch_static_info((depth.width, depth.height), frame.image_dimensions())
        {
            debug!(
                depth_width = depth.width,
                depth_height = depth.height,
                "Static capture info latched"
            );
        }

        let confidence =
            match acquire(frame.acquire_raw_confidence_image(), ImageKind::Confidence)? {
                Ok(confidence) => confidence,
                Err(reason) => return Ok(self.skip(record.timestamp, reason)),
            };

        let ranges = Bytes::from(repack_depth_image(&depth.data));
        let line = serde_json::to_string(&record)?;
        let timestamp = record.timestamp;

        // the depth record defines the frame; once it is on disk the frame counts
        if !self.handle_write(self.write(keys::DEPTH, &ranges))? {
            return Ok(self.skip(timestamp, SkipReason::Io));
        }
        let count = self.session.inc_frame_count();
        self.session.set_last_frame(LastFrame {
            depth: ranges,
            confidence: confidence.data.clone(),
            record,
        });

        // a record lost here is restored by padding at session end
        self.handle_write(self.write(keys::CONFIDENCE, &confidence.data))?;
        self.handle_write(self.write_line(keys::CAMERA_INFO, &line))?;

        self.session.with_stats(|stats| stats.on_frame(timestamp));
        observability::record_frame_recorded(count);

        if self.session.debug() {
            self.write_debug_dump(&depth);
        }

        trace!(count, "Frame recorded");
        Ok(FrameOutcome::Recorded(count))
    }

    fn skip(&self, timestamp: i64, reason: SkipReason) -> FrameOutcome {
        debug!(timestamp, reason = %reason, "Frame skipped");
        self.session.with_stats(|stats| stats.on_skip(reason));
        observability::record_frame_skipped(reason);
        FrameOutcome::Skipped(reason)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), RegistryError> {
        self.session.append(key, bytes)
    }

    fn write_line(&self, key: &str, text: &str) -> Result<(), RegistryError> {
        self.session.append_line(key, text)
    }

    /// `Ok(false)` when an I/O failure dropped the record
    fn handle_write(&self, result: Result<(), RegistryError>) -> Result<bool, RecorderError> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_io() => {
                error!(stream = %e.key(), error = %e, "Frame write failed, record dropped");
                observability::record_stream_append_failure(e.key());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Debug text only; failures never affect the frame
    fn write_debug_dump(&self, depth: &DepthImage) {
        let (ranges, classes) = split_depth_image(&depth.data);
        for (key, line) in [
            (keys::DEPTH_DEBUG, format_list(&ranges)),
            (keys::CONFIDENCE_DEBUG, format_list(&classes)),
        ] {
            if let Err(e) = self.handle_write(self.write_line(key, &line)) {
                warn!(stream = key, error = %e, "Debug dump not written");
            }
        }
    }
}

/// Split acquisition results into: hard error / skip reason / image
fn acquire<T: WellFormed>(
    result: Result<T, CaptureError>,
    kind: ImageKind,
) -> Result<Result<T, SkipReason>, RecorderError> {
    let reason = match kind {
        ImageKind::Depth => SkipReason::DepthUnavailable,
        ImageKind::Confidence => SkipReason::ConfidenceUnavailable,
    };
    match result {
        Ok(image) if image.well_formed() => Ok(Ok(image)),
        Ok(_) => {
            debug!(image = %kind, "Malformed image buffer");
            Ok(Err(reason))
        }
        Err(e) if e.is_transient() => {
            debug!(error = %e, "Image not available");
            Ok(Err(reason))
        }
        Err(e) => Err(e.into()),
    }
}

trait WellFormed {
    fn well_formed(&self) -> bool;
}

impl WellFormed for DepthImage {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

impl WellFormed for ConfidenceImage {
    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}
