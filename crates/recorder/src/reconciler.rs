//! Session reconciler - runs once after recording stops
//!
//! 1. Pad each camera stream up to the video frame count by repeating the
//!    last frame. Padded camera records continue the last real timestamp one
//!    video frame interval apart. This is a count fix, not a temporal resync.
//! 2. Write the metadata document.
//! 3. Close every stream.
//! 4. Prepend PLY headers to the IMU files.
//!
//! Every step runs even when an earlier one failed; the first failure is
//! returned once the bundle is as complete as it can be.

use std::path::PathBuf;

use bytes::Bytes;
use contracts::{ImuChannel, SessionMetadata, StaticCaptureInfo, VideoContainer};
use observability::CaptureSummary;
use tracing::{error, info, instrument, warn};

use crate::error::RecorderError;
use crate::header::{imu_header, prepend_header, PlyFormat};
use crate::layout::keys;
use crate::session::{LastFrame, Session};

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub folder_id: String,
    pub dir: PathBuf,
    /// Frame count reported by the video container (or the fallback)
    pub video_frames: u64,
    /// Depth frames written while recording
    pub recorded_frames: u64,
    /// Depth frames appended by padding
    pub padded_frames: u64,
    /// Final depth frame count
    pub depth_frames: u64,
    pub imu_samples: Vec<(ImuChannel, u64)>,
    pub metadata: SessionMetadata,
    pub summary: CaptureSummary,
}

/// Finalize `session` against its video container.
///
/// Must run after [`Session::stop_recording`]; nothing else may write to the
/// session's streams while it runs.
#[instrument(
    name = "session_reconcile",
    skip(session, video),
    fields(folder = %session.folder_id())
)]
pub fn reconcile(
    session: &Session,
    video: &dyn VideoContainer,
) -> Result<ReconcileReport, RecorderError> {
    let recorded_frames = session.frame_count();
    let video_frames = match video.frame_count() {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, fallback = recorded_frames, "Cannot read video frame count");
            recorded_frames
        }
    };

    let mut first_error = None;

    let padded = pad_frames(session, recorded_frames, video_frames);
    let padded_frames = keep_first(&mut first_error, padded).unwrap_or_default();
    let depth_frames = session.frame_count();

    let metadata = build_metadata(session, video_frames);
    keep_first(&mut first_error, write_metadata(session, &metadata));

    keep_first(&mut first_error, session.registry().close_all().map_err(Into::into));

    let imu_samples = session.imu_counts();
    keep_first(&mut first_error, write_imu_headers(session, &imu_samples));

    observability::record_padded_frames(padded_frames);
    observability::record_session_reconciled(depth_frames, video_frames);

    let summary = session.with_stats(|stats| {
        stats.on_padding(padded_frames);
        for (channel, count) in &imu_samples {
            stats.set_imu_samples(channel.id(), *count);
        }
        stats.summary()
    });

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(
        video_frames,
        recorded_frames, padded_frames, depth_frames, "Session reconciled"
    );

    Ok(ReconcileReport {
        folder_id: session.folder_id().to_string(),
        dir: session.layout().dir().to_path_buf(),
        video_frames,
        recorded_frames,
        padded_frames,
        depth_frames,
        imu_samples,
        metadata,
        summary,
    })
}

/// Remember the first error, hand back the value otherwise
fn keep_first<T>(slot: &mut Option<RecorderError>, result: Result<T, RecorderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "Reconcile step failed");
            slot.get_or_insert(e);
            None
        }
    }
}

/// Nanoseconds between two video frames
fn frame_interval_ns(frequency: u32) -> i64 {
    1_000_000_000 / i64::from(frequency.max(1))
}

/// Bring `depth`, `confidence` and `camera_info` up to the video frame
/// count. Returns the number of padded depth frames.
fn pad_frames(session: &Session, recorded: u64, video: u64) -> Result<u64, RecorderError> {
    if video < recorded {
        warn!(video, recorded, "More depth frames than video frames");
    }
    let target = video.max(recorded);

    let Some(last) = session.last_frame() else {
        if target > 0 {
            warn!(missing = target, "No frame captured, padding impossible");
        }
        return Ok(0);
    };
    let interval = frame_interval_ns(session.config().video.frequency);
    let LastFrame {
        depth,
        confidence,
        record,
    } = last;

    let padded = pad_stream(session, keys::DEPTH, target, |_| Ok(depth.clone()))?;
    session.add_frames(padded);
    pad_stream(session, keys::CONFIDENCE, target, |_| Ok(confidence.clone()))?;
    pad_stream(session, keys::CAMERA_INFO, target, |k| {
        let mut line = serde_json::to_string(&record.restamped(record.timestamp + k * interval))?;
        line.push('\n');
        Ok(Bytes::from(line))
    })?;

    if padded > 0 {
        warn!(padded, "Depth stream padded with copies of the last frame");
    }
    Ok(padded)
}

/// Append `payload(k)` for k = 1.. until `key` holds `target` records
fn pad_stream(
    session: &Session,
    key: &str,
    target: u64,
    payload: impl Fn(i64) -> Result<Bytes, RecorderError>,
) -> Result<u64, RecorderError> {
    let missing = target.saturating_sub(session.stream_records(key));
    let mut padded = 0;
    for k in 1..=missing {
        let bytes = payload(k as i64)?;
        match session.append(key, &bytes) {
            Ok(()) => padded += 1,
            Err(e) if e.is_io() => {
                error!(stream = key, error = %e, padded, missing, "Padding write failed, stopping");
                observability::record_stream_append_failure(key);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(padded)
}

/// An I/O failure drops the document; the session still closes
fn write_metadata(session: &Session, metadata: &SessionMetadata) -> Result<(), RecorderError> {
    let json = serde_json::to_string(metadata)?;
    match session.append(keys::METADATA, json.as_bytes()) {
        Ok(()) => Ok(()),
        Err(e) if e.is_io() => {
            error!(error = %e, "Metadata write failed, document dropped");
            observability::record_stream_append_failure(keys::METADATA);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn build_metadata(session: &Session, frame_count: u64) -> SessionMetadata {
    let info = match session.static_info() {
        Some(info) => info.clone(),
        None => {
            warn!("No depth frame captured, metadata has empty capture info");
            let device = &session.config().device;
            StaticCaptureInfo {
                device_name: device.name.clone(),
                user_name: device.user.clone(),
                manufacturer: device.manufacturer.clone(),
                model: device.model.clone(),
                ..StaticCaptureInfo::default()
            }
        }
    };

    let config = session.config();
    let metadata = SessionMetadata::new(&info, session.request(), frame_count, config.video.frequency);
    let metadata = session
        .imu_counts()
        .into_iter()
        .fold(metadata, |metadata, (channel, count)| {
            metadata.with_imu_stream(channel, count, config.imu.sampling_period_us)
        });

    // registered streams plus the video container
    let files = session.registry().len() as u32 + 1;
    metadata.with_number_of_files(files)
}

/// Every file gets its header attempt; the first failure is returned
fn write_imu_headers(
    session: &Session,
    samples: &[(ImuChannel, u64)],
) -> Result<(), RecorderError> {
    let layout = session.layout();
    let mut files = Vec::new();
    for (channel, count) in samples {
        let header = |format| imu_header(*channel, *count, format);
        files.push((layout.imu_path(*channel), header(PlyFormat::BinaryBigEndian)));
        if session.debug() {
            files.push((layout.imu_ascii_path(*channel), header(PlyFormat::Ascii)));
        }
    }

    let mut first_error = None;
    for (path, header) in files {
        if let Err(e) = prepend_header(&path, &header) {
            error!(path = %path.display(), error = %e, "IMU header not written");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
