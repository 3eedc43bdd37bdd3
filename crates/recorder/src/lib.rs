//! # Recorder
//!
//! 扫描录制核心。
//!
//! Responsibilities:
//! - Create the session folder and register its streams (`Session`)
//! - Write camera frames: repacked depth, confidence, camera info (`FrameRecorder`)
//! - Write IMU samples from concurrent sensor threads (`ImuRecorder`)
//! - After stop: pad to the video frame count, write metadata, close
//!   streams, prepend IMU headers (`reconcile`)
//! - Start/stop orchestration with at most one active session (`CaptureController`)
//! - Read finished bundles back (`SessionBundle`)
//!
//! ## Bundle layout
//!
//! ```text
//! <output_dir>/<id>/
//!   <id>.depth.zlib        raw deflate, u16 LE ranges
//!   <id>.confidence.zlib   raw deflate, u8 per pixel
//!   <id>.jsonl             one camera record per frame
//!   <id>.json              metadata
//!   <id>.mp4               video (written by the encoder)
//!   <id>.{rot,acce,grav,mag,atti}   PLY header + 32-byte BE records
//! ```

pub mod bundle;
pub mod controller;
pub mod error;
pub mod frame;
pub mod header;
pub mod imu;
pub mod layout;
pub mod reconciler;
pub mod session;

#[cfg(test)]
mod testing;

pub use bundle::{ImuTrack, SessionBundle};
pub use controller::CaptureController;
pub use error::RecorderError;
pub use frame::{FrameOutcome, FrameRecorder};
pub use header::{imu_header, parse_header, prepend_header, ParsedHeader, PlyFormat};
pub use imu::{ImuOutcome, ImuRecorder};
pub use layout::{keys, PlannedStream, SessionLayout, FOLDER_TIME_FORMAT};
pub use reconciler::{reconcile, ReconcileReport};
pub use session::{LastFrame, RecordingGuard, Session};

#[cfg(test)]
mod tests {
    use super::*;
    use capture_sources::{FixedFrameCountVideo, SyntheticArRuntime};
    use contracts::{CaptureConfig, FixedLocation, SessionRequest};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// 10 frames, depth of frame 4 unavailable, video has 10 frames
    #[test]
    fn test_dropped_frame_is_padded_back() {
        let dir = tempdir().unwrap();
        let session = Arc::new(
            Session::open(
                SessionLayout::new(dir.path(), "s"),
                &CaptureConfig::default(),
                SessionRequest::default(),
                Arc::new(FixedLocation::default()),
            )
            .unwrap(),
        );
        let recorder = FrameRecorder::new(Arc::clone(&session));
        let runtime = SyntheticArRuntime::new(8, 6).with_depth_failures([4]);

        let outcomes: Vec<_> = runtime
            .frames(10)
            .map(|frame| recorder.on_frame(&frame).unwrap())
            .collect();
        assert_eq!(
            outcomes.iter().filter(|o| matches!(o, FrameOutcome::Recorded(_))).count(),
            9
        );
        assert!(matches!(outcomes[4], FrameOutcome::Skipped(_)));
        assert_eq!(session.frame_count(), 9);

        session.stop_recording();
        let report = reconcile(&session, &FixedFrameCountVideo(10)).unwrap();
        assert_eq!(report.padded_frames, 1);
        assert_eq!(report.depth_frames, 10);
        assert_eq!(report.summary.frames_recorded, 9);

        let bundle = SessionBundle::open(session.layout().dir()).unwrap();
        assert_eq!(bundle.depth_frames().unwrap().len(), 10);
        assert_eq!(bundle.confidence_frames().unwrap().len(), 10);
        assert_eq!(bundle.camera_info().unwrap().len(), 10);
    }
}
