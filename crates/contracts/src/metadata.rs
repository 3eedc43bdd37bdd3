//! Session metadata - `<id>.json`, written once when a session ends

use serde::{Deserialize, Serialize};

use crate::{GpsFix, ImuChannel, SessionRequest};

/// Capture info latched on the first frame that yields a depth image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StaticCaptureInfo {
    pub depth_width: u32,
    pub depth_height: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub device_name: String,
    pub user_name: String,
    pub manufacturer: String,
    pub model: String,
    pub gps: Option<GpsFix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub id: Option<String>,
    /// `<manufacturer>_<model>`
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    /// `[latitude, longitude]`, null without a fix
    pub gps_location: Option<[f64; 2]>,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
}

/// One entry of the `streams` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub number_of_frames: u64,
    pub frequency: u32,
    pub file_extension: String,
    pub encoding: String,
    /// `[height, width]` for depth, `[width, height]` for color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<[u32; 2]>,
}

/// Root metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub device: DeviceInfo,
    pub scene: SceneInfo,
    pub user: UserInfo,
    pub streams: Vec<StreamInfo>,
    pub number_of_files: u32,
    pub depth_unit: String,
    pub depth_confidence_available: bool,
    pub depth_confidence_value_range: [u32; 2],
    pub camera_orientation_quaternion_format: String,
    pub camera_orientation_euler_angles_format: Option<String>,
}

impl SessionMetadata {
    /// Camera-side metadata; every camera stream reports `frame_count`.
    pub fn new(
        info: &StaticCaptureInfo,
        request: &SessionRequest,
        frame_count: u64,
        video_frequency: u32,
    ) -> Self {
        let camera_stream = |id: &str, kind: &str, ext: &str, encoding: &str| StreamInfo {
            id: id.to_string(),
            kind: kind.to_string(),
            number_of_frames: frame_count,
            frequency: video_frequency,
            file_extension: ext.to_string(),
            encoding: encoding.to_string(),
            resolution: None,
        };

        let streams = vec![
            StreamInfo {
                resolution: Some([info.image_width, info.image_height]),
                ..camera_stream("color_back_1", "rgb_camera", "mp4", "h264")
            },
            StreamInfo {
                resolution: Some([info.depth_height, info.depth_width]),
                ..camera_stream("depth_back_1", "ARCore", "depth.zlib", "uint8_zlib")
            },
            camera_stream(
                "confidence_map",
                "confidence_map",
                "confidence.zlib",
                "uint8_zlib",
            ),
            camera_stream("camera_info_color_back_1", "camera_info", "jsonl", "jsonl"),
        ];

        Self {
            device: DeviceInfo {
                name: info.device_name.clone(),
                id: None,
                kind: format!("{}_{}", info.manufacturer, info.model),
            },
            scene: SceneInfo {
                gps_location: info.gps.map(|fix| fix.to_array()),
                description: request.description.clone(),
                kind: request.scene_type.clone(),
            },
            user: UserInfo {
                name: info.user_name.clone(),
            },
            streams,
            number_of_files: 0,
            depth_unit: "mm".to_string(),
            depth_confidence_available: true,
            depth_confidence_value_range: [0, 255],
            camera_orientation_quaternion_format: "xyzw".to_string(),
            camera_orientation_euler_angles_format: None,
        }
    }

    /// Append an IMU stream entry (`rot_1` / `rotation_1`, ...)
    pub fn with_imu_stream(mut self, channel: ImuChannel, samples: u64, frequency: u32) -> Self {
        self.streams.push(StreamInfo {
            id: format!("{}_1", channel.short_name()),
            kind: format!("{}_1", channel.full_name()),
            number_of_frames: samples,
            frequency,
            file_extension: channel.short_name().to_string(),
            encoding: "binary_big_endian".to_string(),
            resolution: None,
        });
        self
    }

    pub fn with_number_of_files(mut self, count: u32) -> Self {
        self.number_of_files = count;
        self
    }

    /// Stream entry by id
    pub fn stream(&self, id: &str) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.id == id)
    }
}
