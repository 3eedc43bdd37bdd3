//! ImuRecorder - sensor callbacks to per-channel streams
//!
//! Called concurrently from every sensor thread. Per-channel ordering comes
//! from the registry's per-key lock; channels never wait on each other.

use std::sync::Arc;

use contracts::{ImuChannel, ImuRecord, SensorEvent, SensorEventCallback, SensorKind};
use tracing::{error, trace, warn};

use crate::error::RecorderError;
use crate::session::Session;

/// What happened to one sensor event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuOutcome {
    /// Session not recording; nothing touched
    NotRecording,
    /// Uncalibrated accelerometer bias latched, nothing written
    BiasLatched,
    /// Channel not recorded in this session
    ChannelDisabled,
    /// Too few values for the channel
    Malformed,
    /// I/O failure, record dropped
    Dropped,
    /// Record written; carries the channel's new count
    Recorded(ImuChannel, u64),
}

/// Writes IMU samples of one session
#[derive(Debug, Clone)]
pub struct ImuRecorder {
    session: Arc<Session>,
}

impl ImuRecorder {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Handle one sensor event
    pub fn on_event(&self, event: &SensorEvent) -> Result<ImuOutcome, RecorderError> {
        let channel = match event.kind {
            SensorKind::AccelerometerUncalibrated => {
                self.latch_bias(event);
                // devices without a calibrated accelerometer record the raw values instead
                if !self.session.config().imu.uncalibrated_accel {
                    return Ok(ImuOutcome::BiasLatched);
                }
                ImuChannel::Accel
            }
            kind => match kind.channel() {
                Some(channel) => channel,
                None => return Ok(ImuOutcome::ChannelDisabled),
            },
        };

        let Some(_recording) = self.session.recording_guard() else {
            return Ok(ImuOutcome::NotRecording);
        };

        if !self.session.records_channel(channel) {
            return Ok(ImuOutcome::ChannelDisabled);
        }

        let Some(record) = ImuRecord::from_event(channel, event) else {
            warn!(
                channel = %channel,
                values = event.values.len(),
                "Sensor event has too few values, dropped"
            );
            return Ok(ImuOutcome::Malformed);
        };

        if !self.write(channel.id(), &record.to_be_bytes())? {
            return Ok(ImuOutcome::Dropped);
        }
        let count = self
            .session
            .inc_imu_count(channel)
            .unwrap_or_default();
        observability::record_imu_sample(channel.id());

        if self.session.debug() {
            let key = channel.ascii_key();
            if let Err(e) = self.write(&key, record.to_ascii_line().as_bytes()) {
                warn!(stream = %key, error = %e, "ASCII mirror not written");
            }
        }
        trace!(channel = %channel, count, "IMU sample recorded");
        Ok(ImuOutcome::Recorded(channel, count))
    }

    /// Callback to hand to every `SensorSource` of the session
    pub fn callback(&self) -> SensorEventCallback {
        let recorder = self.clone();
        Arc::new(move |event: SensorEvent| {
            if let Err(e) = recorder.on_event(&event) {
                error!(kind = ?event.kind, error = %e, "IMU event failed");
            }
        })
    }

    fn latch_bias(&self, event: &SensorEvent) {
        match event.values.get(3..6) {
            Some(&[x, y, z]) => self.session.set_accel_bias([x, y, z]),
            _ => warn!(
                values = event.values.len(),
                "Uncalibrated accelerometer event without bias values"
            ),
        }
    }

    /// `Ok(false)` when an I/O failure dropped the record
    fn write(&self, key: &str, bytes: &[u8]) -> Result<bool, RecorderError> {
        match self.session.append(key, bytes) {
            Ok(()) => Ok(true),
            Err(e) if e.is_io() => {
                error!(stream = %key, error = %e, "IMU write failed, record dropped");
                observability::record_stream_append_failure(key);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
