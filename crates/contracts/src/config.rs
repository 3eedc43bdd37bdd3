//! 采集配置
//!
//! 字段级规则由 `validator` 派生宏声明，跨字段规则在 `config_loader` 中校验。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ImuChannel;

/// 顶层采集配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CaptureConfig {
    /// 会话输出配置
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionConfig,

    /// 设备与用户信息
    #[serde(default)]
    #[validate(nested)]
    pub device: DeviceConfig,

    /// IMU 采集配置
    #[serde(default)]
    #[validate(nested)]
    pub imu: ImuConfig,

    /// 视频流配置
    #[serde(default)]
    #[validate(nested)]
    pub video: VideoConfig,
}

/// 会话输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// 会话目录的父目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 调试模式: 保留 ASCII 镜像并输出深度/置信度文本
    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            debug: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scans")
}

/// 设备与用户信息，写入元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// 设备 ID，作为会话目录名后缀
    #[serde(default = "default_device_id")]
    #[validate(length(min = 1, max = 64))]
    pub device_id: String,

    /// 用户为设备起的名字
    #[serde(default)]
    pub name: String,

    /// 采集者
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub manufacturer: String,

    #[serde(default)]
    pub model: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            name: String::new(),
            user: String::new(),
            manufacturer: String::new(),
            model: String::new(),
        }
    }
}

fn default_device_id() -> String {
    "device".to_string()
}

/// IMU 采集配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImuConfig {
    /// 向平台请求的采样周期 (微秒)
    #[serde(default = "default_sampling_period_us")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub sampling_period_us: u32,

    /// 记录的通道
    #[serde(default = "default_channels")]
    #[validate(length(min = 1))]
    pub channels: Vec<ImuChannel>,

    /// 平台只提供未校准加速度计时为 true
    #[serde(default)]
    pub uncalibrated_accel: bool,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            sampling_period_us: default_sampling_period_us(),
            channels: default_channels(),
            uncalibrated_accel: false,
        }
    }
}

fn default_sampling_period_us() -> u32 {
    100
}

fn default_channels() -> Vec<ImuChannel> {
    ImuChannel::ALL.to_vec()
}

/// 视频流配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VideoConfig {
    /// 元数据中记录的帧率
    #[serde(default = "default_video_frequency")]
    #[validate(range(min = 1, max = 240))]
    pub frequency: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frequency: default_video_frequency(),
        }
    }
}

fn default_video_frequency() -> u32 {
    60
}

/// 单次录制请求 (来自界面或命令行)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub scene_type: String,
    pub description: String,
}
