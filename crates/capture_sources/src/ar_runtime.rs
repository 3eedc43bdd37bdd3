//! Synthetic AR runtime
//!
//! Frames are pure functions of their index, so a test can recompute what
//! must have been written.

use std::collections::BTreeSet;
use std::f64::consts::FRAC_PI_2;

use bytes::Bytes;
use contracts::{
    CameraFrame, CaptureError, ConfidenceImage, DepthImage, FrameRecord, ImageKind, Intrinsics,
    Pose,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// 60 fps
pub const FRAME_INTERVAL_NS: i64 = 16_666_667;

/// Color image size reported by every frame
pub const IMAGE_SIZE: (u32, u32) = (1920, 1080);

/// Radius of the circular camera trajectory (metres)
const TRAJECTORY_RADIUS: f64 = 0.5;

/// One synthetic frame
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    index: u64,
    width: u32,
    height: u32,
    depth_available: bool,
    confidence_available: bool,
}

impl SyntheticFrame {
    /// Frame `index` with a `width` x `height` depth image
    pub fn new(index: u64, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            depth_available: true,
            confidence_available: true,
        }
    }

    /// Depth acquisition fails for this frame
    pub fn without_depth(mut self) -> Self {
        self.depth_available = false;
        self
    }

    /// Confidence acquisition fails for this frame
    pub fn without_confidence(mut self) -> Self {
        self.confidence_available = false;
        self
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> i64 {
        self.index as i64 * FRAME_INTERVAL_NS
    }

    /// Packed sample of `pixel`: range in the low 13 bits, class in the top 3
    pub fn depth_sample(index: u64, pixel: usize) -> u16 {
        let range = ((index as usize * 31 + pixel * 7) % 8000 + 100) as u16;
        let class = (pixel % 8) as u16;
        range | (class << 13)
    }

    pub fn confidence_value(index: u64, pixel: usize) -> u8 {
        ((index as usize + pixel * 37) % 256) as u8
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn camera_pose(&self) -> Isometry3<f64> {
        let angle = self.index as f64 * 0.01;
        Isometry3::from_parts(
            Translation3::new(
                TRAJECTORY_RADIUS * angle.cos(),
                0.0,
                TRAJECTORY_RADIUS * angle.sin(),
            ),
            UnitQuaternion::from_euler_angles(0.0, angle, 0.0),
        )
    }
}

/// Isometry as a runtime pose (column-major matrix, xyzw quaternion)
fn to_pose(iso: &Isometry3<f64>) -> Pose {
    let homogeneous = iso.to_homogeneous();
    let mut matrix = [0.0f32; 16];
    for (dst, src) in matrix.iter_mut().zip(homogeneous.as_slice()) {
        *dst = *src as f32;
    }
    let q = iso.rotation;
    Pose {
        matrix,
        rotation: [q.i as f32, q.j as f32, q.k as f32, q.w as f32],
    }
}

impl CameraFrame for SyntheticFrame {
    fn frame_record(&self) -> FrameRecord {
        let camera = self.camera_pose();
        // sensor frame is the camera frame turned a quarter around its optical axis
        let sensor = camera * Isometry3::rotation(Vector3::z() * FRAC_PI_2);
        let (w, h) = IMAGE_SIZE;
        FrameRecord::new(
            self.timestamp(),
            8_000_000,
            Intrinsics {
                fx: 1450.0,
                fy: 1450.0,
                cx: w as f32 / 2.0,
                cy: h as f32 / 2.0,
            },
            to_pose(&camera),
            to_pose(&sensor),
        )
    }

    fn image_dimensions(&self) -> (u32, u32) {
        IMAGE_SIZE
    }

    fn acquire_raw_depth_image(&self) -> Result<DepthImage, CaptureError> {
        if !self.depth_available {
            return Err(CaptureError::acquisition(
                ImageKind::Depth,
                "depth not yet available",
            ));
        }
        let data: Vec<u8> = (0..self.pixel_count())
            .flat_map(|pixel| Self::depth_sample(self.index, pixel).to_le_bytes())
            .collect();
        Ok(DepthImage {
            width: self.width,
            height: self.height,
            data: Bytes::from(data),
        })
    }

    fn acquire_raw_confidence_image(&self) -> Result<ConfidenceImage, CaptureError> {
        if !self.confidence_available {
            return Err(CaptureError::acquisition(
                ImageKind::Confidence,
                "confidence not yet available",
            ));
        }
        let data: Vec<u8> = (0..self.pixel_count())
            .map(|pixel| Self::confidence_value(self.index, pixel))
            .collect();
        Ok(ConfidenceImage {
            width: self.width,
            height: self.height,
            data: Bytes::from(data),
        })
    }
}

/// Frame factory with a failure schedule
#[derive(Debug, Clone, Default)]
pub struct SyntheticArRuntime {
    width: u32,
    height: u32,
    depth_failures: BTreeSet<u64>,
    confidence_failures: BTreeSet<u64>,
}

impl SyntheticArRuntime {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Frames whose depth acquisition fails
    pub fn with_depth_failures(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.depth_failures.extend(indices);
        self
    }

    /// Frames whose confidence acquisition fails
    pub fn with_confidence_failures(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.confidence_failures.extend(indices);
        self
    }

    pub fn depth_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(&self, index: u64) -> SyntheticFrame {
        let mut frame = SyntheticFrame::new(index, self.width, self.height);
        if self.depth_failures.contains(&index) {
            frame = frame.without_depth();
        }
        if self.confidence_failures.contains(&index) {
            frame = frame.without_confidence();
        }
        frame
    }

    /// Frames `0..count`
    pub fn frames(&self, count: u64) -> impl Iterator<Item = SyntheticFrame> + '_ {
        (0..count).map(move |index| self.frame(index))
    }
}
