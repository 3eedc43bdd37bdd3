//! External collaborators: sensor platform, video encoder, location provider
//!
//! The recorders never talk to hardware directly; everything they consume
//! comes through these traits so synthetic sources can stand in for tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, SensorEvent, SensorKind};

/// Sensor event callback
///
/// Invoked on the sensor's own thread. Uses `Arc` so one callback can be
/// shared by every sensor of a session.
pub type SensorEventCallback = Arc<dyn Fn(SensorEvent) + Send + Sync>;

/// Hardware sensor abstraction
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = platform.sensor(SensorKind::Gyroscope);
/// sensor.listen(Arc::new(|event| println!("{:?}", event.values)));
/// // ... record ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Kind of events this sensor produces
    fn kind(&self) -> SensorKind;

    /// Start delivering events to `callback`.
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: SensorEventCallback);

    /// Stop delivering events. Returns after the delivery thread has exited.
    fn stop(&self);

    fn is_listening(&self) -> bool;
}

/// Finalized video container
pub trait VideoContainer: Send + Sync {
    /// Authoritative number of encoded frames, read after the encoder has
    /// been finalized.
    fn frame_count(&self) -> Result<u64, CaptureError>;
}

/// Last known GPS fix: latitude, longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    pub fn to_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Location provider
pub trait LocationProvider: Send + Sync {
    /// `None` when no fix is available or permission is missing
    fn last_known_fix(&self) -> Option<GpsFix>;
}

/// Provider that always reports the same fix (or none)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<GpsFix>);

impl LocationProvider for FixedLocation {
    fn last_known_fix(&self) -> Option<GpsFix> {
        self.0
    }
}
