//! # Contracts
//!
//! Shared interface contracts of the capture workspace: records written to a
//! session bundle, configuration, and the traits behind which the AR runtime,
//! sensor platform, video encoder and location provider live.
//! Every other crate depends on this one; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are nanoseconds (i64) as reported by the producing runtime
//! - Padded frames continue the last real timestamp, one video frame interval apart

mod config;
mod error;
mod frame;
mod imu;
mod metadata;
mod sensor_source;
mod stream_key;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use imu::*;
pub use metadata::*;
pub use sensor_source::*;
pub use stream_key::StreamKey;
