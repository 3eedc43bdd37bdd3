//! CaptureController - start/stop of sessions
//!
//! At most one session is active. `stop` runs the reconciler on the blocking
//! pool so the caller (UI / CLI task) is never blocked on file I/O.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, TimeZone};
use contracts::{CaptureConfig, CaptureError, LocationProvider, SessionRequest, VideoContainer};
use tracing::{info, instrument, warn};

use crate::error::RecorderError;
use crate::frame::FrameRecorder;
use crate::imu::ImuRecorder;
use crate::layout::SessionLayout;
use crate::reconciler::{reconcile, ReconcileReport};
use crate::session::Session;

/// Owns the active session
pub struct CaptureController {
    config: Arc<CaptureConfig>,
    location: Arc<dyn LocationProvider>,
    active: Mutex<Option<Arc<Session>>>,
}

impl CaptureController {
    pub fn new(config: CaptureConfig, location: Arc<dyn LocationProvider>) -> Self {
        Self {
            config: Arc::new(config),
            location,
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Start a session named after the current local time
    pub fn start(&self, request: SessionRequest) -> Result<Arc<Session>, RecorderError> {
        self.start_at(&Local::now(), request)
    }

    /// Start a session named after `now`
    #[instrument(name = "capture_start", skip(self, now, request), fields(scene = %request.scene_type))]
    pub fn start_at<Tz>(
        &self,
        now: &DateTime<Tz>,
        request: SessionRequest,
    ) -> Result<Arc<Session>, RecorderError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = active.as_ref() {
            return Err(CaptureError::SessionActive {
                folder_id: session.folder_id().to_string(),
            }
            .into());
        }

        let id = SessionLayout::folder_id(now, &self.config.device.device_id);
        let layout = SessionLayout::new(&self.config.session.output_dir, id);
        let session = Arc::new(Session::open(
            layout,
            &self.config,
            request,
            Arc::clone(&self.location),
        )?);

        info!(folder = %session.folder_id(), "Capture started");
        *active = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn active_session(&self) -> Option<Arc<Session>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_recording(&self) -> bool {
        self.active_session()
            .is_some_and(|session| session.is_recording())
    }

    /// Frame recorder bound to the active session
    pub fn frame_recorder(&self) -> Option<FrameRecorder> {
        self.active_session().map(FrameRecorder::new)
    }

    /// IMU recorder bound to the active session
    pub fn imu_recorder(&self) -> Option<ImuRecorder> {
        self.active_session().map(ImuRecorder::new)
    }

    /// Stop the active session and reconcile it against `video`.
    ///
    /// A second concurrent `stop` gets `NoActiveSession`; the session is
    /// finalized exactly once.
    #[instrument(name = "capture_stop", skip(self, video))]
    pub async fn stop(
        &self,
        video: Arc<dyn VideoContainer>,
    ) -> Result<ReconcileReport, RecorderError> {
        let session = self
            .active_session()
            .ok_or(CaptureError::NoActiveSession)?;
        if !session.begin_finalize() {
            warn!(folder = %session.folder_id(), "Session already finalizing");
            return Err(CaptureError::NoActiveSession.into());
        }

        let task_session = Arc::clone(&session);
        let result = tokio::task::spawn_blocking(move || {
            task_session.stop_recording();
            reconcile(&task_session, video.as_ref())
        })
        .await
        .map_err(|e| RecorderError::Join {
            message: e.to_string(),
        });

        // the slot is freed even when reconciling failed
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &session))
            {
                *active = None;
            }
        }

        let report = result??;
        info!(
            folder = %report.folder_id,
            frames = report.depth_frames,
            padded = report.padded_frames,
            "Capture stopped"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("output_dir", &self.config.session.output_dir)
            .field("active", &self.active_session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_sources::{FixedFrameCountVideo, SyntheticFrame};
    use chrono::FixedOffset;
    use contracts::FixedLocation;
    use tempfile::tempdir;

    fn controller(dir: &std::path::Path) -> CaptureController {
        let mut config = CaptureConfig::default();
        config.session.output_dir = dir.to_path_buf();
        config.device.device_id = "pixel".into();
        CaptureController::new(config, Arc::new(FixedLocation::default()))
    }

    fn at(second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 10, 15, second)
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_record_stop() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path());

        let session = controller.start_at(&at(30), SessionRequest::default()).unwrap();
        assert_eq!(session.folder_id(), "20240501T101530+0000_pixel");
        assert!(controller.is_recording());

        let recorder = controller.frame_recorder().unwrap();
        for i in 0..3 {
            recorder.on_frame(&SyntheticFrame::new(i, 4, 3)).unwrap();
        }

        let report = controller
            .stop(Arc::new(FixedFrameCountVideo(3)))
            .await
            .unwrap();
        assert_eq!(report.depth_frames, 3);
        assert_eq!(report.padded_frames, 0);
        assert!(controller.active_session().is_none());
        assert!(!session.is_recording());
        assert!(report.dir.join("20240501T101530+0000_pixel.json").exists());
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path());

        controller.start_at(&at(1), SessionRequest::default()).unwrap();
        let err = controller
            .start_at(&at(2), SessionRequest::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RecorderError::Capture(CaptureError::SessionActive { .. })
        ));

        controller
            .stop(Arc::new(FixedFrameCountVideo(0)))
            .await
            .unwrap();
        // a new session can start once the previous one is finalized
        controller.start_at(&at(3), SessionRequest::default()).unwrap();
        controller
            .stop(Arc::new(FixedFrameCountVideo(0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_session() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path());
        let err = controller
            .stop(Arc::new(FixedFrameCountVideo(0)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecorderError::Capture(CaptureError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_existing_folder_is_user_facing() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path());
        std::fs::create_dir(dir.path().join("20240501T101505+0000_pixel")).unwrap();

        let err = controller
            .start_at(&at(5), SessionRequest::default())
            .unwrap_err();
        assert!(err.is_user_facing());
        assert!(controller.active_session().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_stop_finalizes_once() {
        let dir = tempdir().unwrap();
        let controller = Arc::new(controller(dir.path()));
        controller.start_at(&at(9), SessionRequest::default()).unwrap();

        let a = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.stop(Arc::new(FixedFrameCountVideo(0))).await })
        };
        let b = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.stop(Arc::new(FixedFrameCountVideo(0))).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }
}
