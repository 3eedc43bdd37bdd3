//! Session - shared state of one recording
//!
//! Producers (render thread, sensor threads) and the reconciler all work
//! against one `Session`:
//!
//! - the recording gate: producers hold its read side for the whole write,
//!   `stop_recording` takes the write side, so once it returns no producer
//!   is mid-write and none will start another
//! - frame and per-channel counters
//! - static capture info, latched once
//! - the last written (depth, confidence, record) triple for padding

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use bytes::Bytes;
use contracts::{
    CaptureConfig, FrameRecord, ImuChannel, LocationProvider, SessionRequest, StaticCaptureInfo,
};
use observability::CaptureStatsAggregator;
use stream_registry::{RegistryError, StreamRegistry};
use tracing::{debug, info, instrument};

use crate::error::RecorderError;
use crate::layout::SessionLayout;

/// Held by a producer for the duration of one write
pub type RecordingGuard<'a> = RwLockReadGuard<'a, bool>;

/// Last frame that made it to disk
#[derive(Debug, Clone)]
pub struct LastFrame {
    /// Repacked range stream, as appended to `depth`
    pub depth: Bytes,
    /// Raw confidence bytes, as appended to `confidence`
    pub confidence: Bytes,
    pub record: FrameRecord,
}

/// One recording instance
pub struct Session {
    layout: SessionLayout,
    config: CaptureConfig,
    request: SessionRequest,
    registry: StreamRegistry,
    location: Arc<dyn LocationProvider>,

    gate: RwLock<bool>,
    finalizing: AtomicBool,

    frame_count: AtomicU64,
    imu_counts: HashMap<ImuChannel, AtomicU64>,

    static_info: OnceLock<StaticCaptureInfo>,
    last_frame: Mutex<Option<LastFrame>>,
    accel_bias: Mutex<Option<[f32; 3]>>,
    stats: Mutex<CaptureStatsAggregator>,
}

impl Session {
    /// Create the session folder, register every stream and start recording.
    #[instrument(
        name = "session_open",
        skip(layout, config, request, location),
        fields(folder = %layout.id())
    )]
    pub fn open(
        layout: SessionLayout,
        config: &CaptureConfig,
        request: SessionRequest,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self, RecorderError> {
        layout.create()?;

        let registry = StreamRegistry::new();
        for stream in layout.stream_plan(config) {
            if let Err(e) = registry.register(stream.key, &stream.path, stream.encoding) {
                // leave nothing open behind a failed start
                let _ = registry.close_all();
                return Err(e.into());
            }
        }

        let imu_counts = config
            .imu
            .channels
            .iter()
            .map(|channel| (*channel, AtomicU64::new(0)))
            .collect();

        info!(
            dir = %layout.dir().display(),
            streams = registry.len(),
            debug = config.session.debug,
            "Session opened"
        );

        Ok(Self {
            layout,
            config: config.clone(),
            request,
            registry,
            location,
            gate: RwLock::new(true),
            finalizing: AtomicBool::new(false),
            frame_count: AtomicU64::new(0),
            imu_counts,
            static_info: OnceLock::new(),
            last_frame: Mutex::new(None),
            accel_bias: Mutex::new(None),
            stats: Mutex::new(CaptureStatsAggregator::new()),
        })
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn folder_id(&self) -> &str {
        self.layout.id()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn request(&self) -> &SessionRequest {
        &self.request
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn debug(&self) -> bool {
        self.config.session.debug
    }

    // ===== Recording gate =====

    /// Read side of the gate, or `None` when not recording
    pub fn recording_guard(&self) -> Option<RecordingGuard<'_>> {
        let guard = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Some(guard)
        } else {
            None
        }
    }

    pub fn is_recording(&self) -> bool {
        *self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the recording flag.
    ///
    /// Blocks until every producer currently holding a [`RecordingGuard`]
    /// has finished its write. Returns whether the flag was set.
    pub fn stop_recording(&self) -> bool {
        let mut guard = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let was_recording = *guard;
        *guard = false;
        debug!(folder = %self.layout.id(), was_recording, "Recording stopped");
        was_recording
    }

    /// Claim the one-shot finalization; false if already claimed
    pub(crate) fn begin_finalize(&self) -> bool {
        !self.finalizing.swap(true, Ordering::AcqRel)
    }

    // ===== Writes =====

    pub fn append(&self, key: &str, bytes: &[u8]) -> Result<(), RegistryError> {
        self.registry.append(key, bytes)
    }

    pub fn append_line(&self, key: &str, text: &str) -> Result<(), RegistryError> {
        self.registry.append_line(key, text)
    }

    // ===== Counters =====

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    /// Returns the new count
    pub(crate) fn inc_frame_count(&self) -> u64 {
        self.frame_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Padding adds `n` frames at once
    pub(crate) fn add_frames(&self, n: u64) -> u64 {
        self.frame_count.fetch_add(n, Ordering::AcqRel) + n
    }

    /// Records successfully appended to `key` so far
    pub fn stream_records(&self, key: &str) -> u64 {
        self.registry
            .metrics_of(key)
            .map(|m| m.append_count)
            .unwrap_or_default()
    }

    /// `None` when the channel is not recorded in this session
    pub fn imu_count(&self, channel: ImuChannel) -> Option<u64> {
        self.imu_counts
            .get(&channel)
            .map(|count| count.load(Ordering::Acquire))
    }

    pub fn records_channel(&self, channel: ImuChannel) -> bool {
        self.imu_counts.contains_key(&channel)
    }

    pub(crate) fn inc_imu_count(&self, channel: ImuChannel) -> Option<u64> {
        self.imu_counts
            .get(&channel)
            .map(|count| count.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Configured channels with their counts, in configuration order
    pub fn imu_counts(&self) -> Vec<(ImuChannel, u64)> {
        self.config
            .imu
            .channels
            .iter()
            .filter_map(|channel| Some((*channel, self.imu_count(*channel)?)))
            .collect()
    }

    // ===== Latched state =====

    /// Latch static capture info; only the first call has an effect.
    /// Returns true if this call latched it.
    pub(crate) fn latch_static_info(&self, depth_dims: (u32, u32), image_dims: (u32, u32)) -> bool {
        if self.static_info.get().is_some() {
            return false;
        }
        let device = &self.config.device;
        let info = StaticCaptureInfo {
            depth_width: depth_dims.0,
            depth_height: depth_dims.1,
            image_width: image_dims.0,
            image_height: image_dims.1,
            device_name: device.name.clone(),
            user_name: device.user.clone(),
            manufacturer: device.manufacturer.clone(),
            model: device.model.clone(),
            gps: self.location.last_known_fix(),
        };
        self.static_info.set(info).is_ok()
    }

    pub fn static_info(&self) -> Option<&StaticCaptureInfo> {
        self.static_info.get()
    }

    pub(crate) fn set_last_frame(&self, frame: LastFrame) {
        *self
            .last_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    pub fn last_frame(&self) -> Option<LastFrame> {
        self.last_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_accel_bias(&self, bias: [f32; 3]) {
        *self
            .accel_bias
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(bias);
    }

    /// Last accelerometer bias reported by the uncalibrated sensor
    pub fn accel_bias(&self) -> Option<[f32; 3]> {
        *self
            .accel_bias
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_stats<R>(&self, f: impl FnOnce(&mut CaptureStatsAggregator) -> R) -> R {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("folder", &self.layout.id())
            .field("recording", &self.is_recording())
            .field("frames", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FixedLocation, GpsFix};
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn open(dir: &std::path::Path, config: &CaptureConfig) -> Session {
        Session::open(
            SessionLayout::new(dir, "s"),
            config,
            SessionRequest::default(),
            Arc::new(FixedLocation(Some(GpsFix {
                latitude: 1.0,
                longitude: 2.0,
            }))),
        )
        .unwrap()
    }

    #[test]
    fn test_open_registers_plan() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), &CaptureConfig::default());
        assert!(session.is_recording());
        assert_eq!(session.registry().len(), 9);
        assert!(session.layout().depth_path().exists());
        assert_eq!(session.imu_count(ImuChannel::Magnet), Some(0));
        session.registry().close_all().unwrap();
    }

    #[test]
    fn test_open_twice_same_folder_fails() {
        let dir = tempdir().unwrap();
        let first = open(dir.path(), &CaptureConfig::default());
        let err = Session::open(
            SessionLayout::new(dir.path(), "s"),
            &CaptureConfig::default(),
            SessionRequest::default(),
            Arc::new(FixedLocation::default()),
        )
        .unwrap_err();
        assert!(err.is_user_facing());
        first.registry().close_all().unwrap();
    }

    #[test]
    fn test_unconfigured_channel_has_no_counter() {
        let dir = tempdir().unwrap();
        let mut config = CaptureConfig::default();
        config.imu.channels = vec![ImuChannel::Gyro];
        let session = open(dir.path(), &config);
        assert!(!session.records_channel(ImuChannel::Accel));
        assert_eq!(session.inc_imu_count(ImuChannel::Accel), None);
        assert_eq!(session.inc_imu_count(ImuChannel::Gyro), Some(1));
        assert_eq!(session.imu_counts(), vec![(ImuChannel::Gyro, 1)]);
        session.registry().close_all().unwrap();
    }

    #[test]
    fn test_static_info_latched_once() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), &CaptureConfig::default());
        assert!(session.latch_static_info((160, 90), (1920, 1080)));
        assert!(!session.latch_static_info((1, 1), (1, 1)));

        let info = session.static_info().unwrap();
        assert_eq!((info.depth_width, info.depth_height), (160, 90));
        assert_eq!(info.gps.unwrap().longitude, 2.0);
        session.registry().close_all().unwrap();
    }

    #[test]
    fn test_stop_waits_for_in_flight_write() {
        let dir = tempdir().unwrap();
        let session = Arc::new(open(dir.path(), &CaptureConfig::default()));

        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let writer = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let guard = session.recording_guard().unwrap();
                held_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(50));
                session.inc_frame_count();
                drop(guard);
            })
        };

        held_rx.recv().unwrap();
        assert!(session.stop_recording());
        // the in-flight write completed before stop returned
        assert_eq!(session.frame_count(), 1);
        assert!(session.recording_guard().is_none());
        assert!(!session.stop_recording());

        writer.join().unwrap();
        session.registry().close_all().unwrap();
    }

    #[test]
    fn test_finalize_claimed_once() {
        let dir = tempdir().unwrap();
        let session = open(dir.path(), &CaptureConfig::default());
        assert!(session.begin_finalize());
        assert!(!session.begin_finalize());
        session.registry().close_all().unwrap();
    }
}
