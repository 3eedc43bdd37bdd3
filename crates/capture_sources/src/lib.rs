//! # Capture Sources
//!
//! 合成采集源，用于测试和无设备运行。
//!
//! - `SyntheticArRuntime` / `SyntheticFrame`: camera frames with a
//!   deterministic depth pattern, a circular pose trajectory and an
//!   injectable failure schedule
//! - `MockImuSensor`: `SensorSource` that emits events from its own thread
//! - `CountingVideoEncoder` / `FixedFrameCountVideo`: `VideoContainer` stand-ins

pub mod ar_runtime;
pub mod imu_sensor;
pub mod video;

pub use ar_runtime::{SyntheticArRuntime, SyntheticFrame};
pub use imu_sensor::{MockImuConfig, MockImuSensor};
pub use video::{CountingVideoEncoder, FixedFrameCountVideo};
