//! IMU 通道与记录格式
//!
//! 传感器回调 (`SensorEvent`) -> 通道 (`ImuChannel`) -> 记录 (`ImuRecord`)。

use serde::{Deserialize, Serialize};

use crate::StreamKey;

/// 单条记录字节长度 (8 字节时间戳 + 3 x 8 字节 double)
pub const IMU_BINARY_RECORD_LEN: usize = 8 + IMU_VALUE_COUNT * 8;

/// 每条记录的数值个数
pub const IMU_VALUE_COUNT: usize = 3;

/// IMU 通道 (封闭集合)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImuChannel {
    Gyro,
    Accel,
    Gravity,
    Magnet,
    Orientation,
}

impl ImuChannel {
    /// 全部通道，顺序与元数据输出一致
    pub const ALL: [ImuChannel; 5] = [
        ImuChannel::Gyro,
        ImuChannel::Accel,
        ImuChannel::Gravity,
        ImuChannel::Magnet,
        ImuChannel::Orientation,
    ];

    /// 流键 (二进制流)
    pub fn id(&self) -> &'static str {
        match self {
            Self::Gyro => "gyro",
            Self::Accel => "acce",
            Self::Gravity => "gravity",
            Self::Magnet => "magnet",
            Self::Orientation => "orientation",
        }
    }

    /// 文件扩展名
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Gyro => "rot",
            Self::Accel => "acce",
            Self::Gravity => "grav",
            Self::Magnet => "mag",
            Self::Orientation => "atti",
        }
    }

    /// 元数据与文件头中使用的全名
    pub fn full_name(&self) -> &'static str {
        match self {
            Self::Gyro => "rotation",
            Self::Accel => "accelerometer",
            Self::Gravity => "gravity",
            Self::Magnet => "magnet",
            Self::Orientation => "attitude",
        }
    }

    /// 每条记录的数值个数
    pub fn value_count(&self) -> usize {
        IMU_VALUE_COUNT
    }

    /// 数值分量名称
    pub fn axis_names(&self) -> [&'static str; IMU_VALUE_COUNT] {
        match self {
            Self::Orientation => ["roll", "pitch", "yaw"],
            _ => ["x", "y", "z"],
        }
    }

    /// 二进制流键
    pub fn key(&self) -> StreamKey {
        StreamKey::from(self.id())
    }

    /// ASCII 镜像流键
    pub fn ascii_key(&self) -> StreamKey {
        self.key().ascii()
    }
}

impl std::fmt::Display for ImuChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// 硬件传感器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    /// values[0..3] 为未校准加速度，values[3..6] 为偏置
    AccelerometerUncalibrated,
    Gyroscope,
    Gravity,
    MagneticField,
    Orientation,
}

impl SensorKind {
    /// 对应的记录通道；未校准加速度计只用于锁存偏置，不落盘
    pub fn channel(&self) -> Option<ImuChannel> {
        match self {
            Self::Accelerometer => Some(ImuChannel::Accel),
            Self::AccelerometerUncalibrated => None,
            Self::Gyroscope => Some(ImuChannel::Gyro),
            Self::Gravity => Some(ImuChannel::Gravity),
            Self::MagneticField => Some(ImuChannel::Magnet),
            Self::Orientation => Some(ImuChannel::Orientation),
        }
    }
}

/// 传感器回调事件
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    /// 传感器类型
    pub kind: SensorKind,
    /// 时间戳 (纳秒)
    pub timestamp: i64,
    /// 原始数值
    pub values: Vec<f32>,
}

impl SensorEvent {
    pub fn new(kind: SensorKind, timestamp: i64, values: impl Into<Vec<f32>>) -> Self {
        Self {
            kind,
            timestamp,
            values: values.into(),
        }
    }
}

/// 单条 IMU 记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuRecord {
    pub channel: ImuChannel,
    /// 时间戳 (纳秒)
    pub timestamp: i64,
    pub values: [f64; IMU_VALUE_COUNT],
}

impl ImuRecord {
    /// 从回调事件构建；数值不足时返回 None
    pub fn from_event(channel: ImuChannel, event: &SensorEvent) -> Option<Self> {
        if event.values.len() < channel.value_count() {
            return None;
        }
        let mut values = [0.0f64; IMU_VALUE_COUNT];
        for (dst, src) in values.iter_mut().zip(&event.values) {
            *dst = f64::from(*src);
        }
        Some(Self {
            channel,
            timestamp: event.timestamp,
            values,
        })
    }

    /// 大端二进制: i64 时间戳 + 3 x f64
    pub fn to_be_bytes(&self) -> [u8; IMU_BINARY_RECORD_LEN] {
        let mut buf = [0u8; IMU_BINARY_RECORD_LEN];
        buf[..8].copy_from_slice(&self.timestamp.to_be_bytes());
        for (i, value) in self.values.iter().enumerate() {
            let start = 8 + i * 8;
            buf[start..start + 8].copy_from_slice(&value.to_be_bytes());
        }
        buf
    }

    /// 解析一条大端二进制记录
    pub fn from_be_bytes(channel: ImuChannel, bytes: &[u8]) -> Option<Self> {
        if bytes.len() < IMU_BINARY_RECORD_LEN {
            return None;
        }
        let timestamp = i64::from_be_bytes(bytes[..8].try_into().ok()?);
        let mut values = [0.0f64; IMU_VALUE_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            let start = 8 + i * 8;
            *value = f64::from_be_bytes(bytes[start..start + 8].try_into().ok()?);
        }
        Some(Self {
            channel,
            timestamp,
            values,
        })
    }

    /// ASCII 行: `timestamp v0 v1 v2\n`，整数值保留 `.0`
    pub fn to_ascii_line(&self) -> String {
        let mut line = self.timestamp.to_string();
        for value in &self.values {
            line.push(' ');
            line.push_str(&format!("{value:?}"));
        }
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let shorts: Vec<_> = ImuChannel::ALL.iter().map(|c| c.short_name()).collect();
        assert_eq!(shorts, ["rot", "acce", "grav", "mag", "atti"]);
        assert_eq!(ImuChannel::Gyro.ascii_key(), "gyro_ascii");
        assert_eq!(ImuChannel::Orientation.axis_names()[2], "yaw");
    }

    #[test]
    fn test_uncalibrated_has_no_channel() {
        assert_eq!(SensorKind::AccelerometerUncalibrated.channel(), None);
        assert_eq!(SensorKind::Accelerometer.channel(), Some(ImuChannel::Accel));
    }

    #[test]
    fn test_binary_layout_is_big_endian() {
        let event = SensorEvent::new(SensorKind::Gyroscope, 1, vec![1.0, 0.0, -2.0]);
        let record = ImuRecord::from_event(ImuChannel::Gyro, &event).unwrap();
        let bytes = record.to_be_bytes();

        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[8..16], &1.0f64.to_be_bytes());
        assert_eq!(&bytes[24..32], &(-2.0f64).to_be_bytes());

        let parsed = ImuRecord::from_be_bytes(ImuChannel::Gyro, &bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_ascii_line_widens_floats() {
        let event = SensorEvent::new(SensorKind::Accelerometer, 123, vec![0.5, 9.75, 0.0]);
        let record = ImuRecord::from_event(ImuChannel::Accel, &event).unwrap();
        assert_eq!(record.to_ascii_line(), "123 0.5 9.75 0.0\n");
    }

    #[test]
    fn test_short_event_rejected() {
        let event = SensorEvent::new(SensorKind::Gravity, 0, vec![1.0, 2.0]);
        assert!(ImuRecord::from_event(ImuChannel::Gravity, &event).is_none());
    }
}
