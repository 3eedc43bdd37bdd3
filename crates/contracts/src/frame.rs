//! Camera frame contracts - AR runtime input and camera-info output
//!
//! Matrices follow the AR runtime convention: column-major, quaternions xyzw.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::CaptureError;

/// Pinhole intrinsics of the color image
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// 3x3 matrix in column-major order: `fx,0,0, 0,fy,0, cx,cy,1`
    pub fn to_column_major(&self) -> [f32; 9] {
        [
            self.fx, 0.0, 0.0, //
            0.0, self.fy, 0.0, //
            self.cx, self.cy, 1.0,
        ]
    }
}

/// Rigid transform as reported by the AR runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// 4x4 column-major transform
    pub matrix: [f32; 16],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
}

impl Default for Pose {
    fn default() -> Self {
        let mut matrix = [0.0; 16];
        matrix[0] = 1.0;
        matrix[5] = 1.0;
        matrix[10] = 1.0;
        matrix[15] = 1.0;
        Self {
            matrix,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Per-frame camera record, one JSON line in `<id>.jsonl`
///
/// Field names are the ones the processing server parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame timestamp (nanoseconds)
    pub timestamp: i64,

    /// Sensor exposure time (nanoseconds), 0 when the runtime does not report it
    pub exposure_duration: i64,

    /// 3x3 intrinsics, column-major
    pub intrinsics: [f32; 9],

    /// Camera pose matrix
    #[serde(rename = "transform")]
    pub camera_transform: [f32; 16],

    /// Device sensor pose matrix
    #[serde(rename = "transformMatrices_from_androidSensorPose")]
    pub sensor_transform: [f32; 16],

    /// Camera pose rotation (xyzw)
    #[serde(rename = "rotationQuaternion")]
    pub camera_rotation: [f32; 4],

    /// Device sensor pose rotation (xyzw)
    #[serde(rename = "rotationQuaternion_from_androidSensorPose")]
    pub sensor_rotation: [f32; 4],
}

impl FrameRecord {
    /// Build a record from runtime values
    pub fn new(
        timestamp: i64,
        exposure_duration: i64,
        intrinsics: Intrinsics,
        camera_pose: Pose,
        sensor_pose: Pose,
    ) -> Self {
        Self {
            timestamp,
            exposure_duration,
            intrinsics: intrinsics.to_column_major(),
            camera_transform: camera_pose.matrix,
            sensor_transform: sensor_pose.matrix,
            camera_rotation: camera_pose.rotation,
            sensor_rotation: sensor_pose.rotation,
        }
    }

    /// Same record with a different timestamp
    pub fn restamped(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

/// Raw depth image: little-endian u16 packed samples, row-major
#[derive(Debug, Clone)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl DepthImage {
    pub const BYTES_PER_PIXEL: usize = 2;

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the buffer length matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.pixel_count() * Self::BYTES_PER_PIXEL
    }
}

/// Raw confidence image: one u8 per pixel, row-major
#[derive(Debug, Clone)]
pub struct ConfidenceImage {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl ConfidenceImage {
    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the buffer length matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.pixel_count()
    }
}

/// One frame handed out by the AR runtime
///
/// Image acquisition may legitimately fail for a given frame (depth lags the
/// color camera); implementations return `CaptureError::Acquisition` then.
pub trait CameraFrame {
    /// Timestamp, exposure, intrinsics and poses of this frame
    fn frame_record(&self) -> FrameRecord;

    /// Color image dimensions (width, height)
    fn image_dimensions(&self) -> (u32, u32);

    /// Raw depth image aligned with this frame
    fn acquire_raw_depth_image(&self) -> Result<DepthImage, CaptureError>;

    /// Raw depth confidence image aligned with this frame
    fn acquire_raw_confidence_image(&self) -> Result<ConfidenceImage, CaptureError>;
}
