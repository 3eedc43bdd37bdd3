//! Mock IMU sensor
//!
//! Implements `SensorSource`; events are delivered from a background thread
//! at the configured rate, like a platform sensor callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{SensorEvent, SensorEventCallback, SensorKind, SensorSource};
use tracing::{debug, trace, warn};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockImuConfig {
    /// 发送频率 (Hz)
    pub frequency_hz: f64,
    /// Stop on its own after this many events
    pub max_events: Option<u64>,
}

impl Default for MockImuConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 200.0,
            max_events: None,
        }
    }
}

/// Mock IMU sensor
pub struct MockImuSensor {
    kind: SensorKind,
    config: MockImuConfig,
    listening: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockImuSensor {
    pub fn new(kind: SensorKind, config: MockImuConfig) -> Self {
        Self {
            kind,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    pub fn with_defaults(kind: SensorKind) -> Self {
        Self::new(kind, MockImuConfig::default())
    }

    /// Events delivered so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    /// Values a sensor of `kind` reports for event `n` at `t` seconds
    pub fn values(kind: SensorKind, n: u64, t: f64) -> Vec<f32> {
        let wobble = (t * 2.0).sin() as f32 * 0.05;
        match kind {
            SensorKind::Accelerometer => vec![wobble, 0.0, 9.81],
            // x, y, z followed by the estimated bias
            SensorKind::AccelerometerUncalibrated => vec![wobble, 0.0, 9.81, 0.01, -0.02, 0.03],
            SensorKind::Gyroscope => vec![0.0, 0.01, wobble],
            SensorKind::Gravity => vec![0.0, 0.0, 9.81],
            SensorKind::MagneticField => vec![22.0, -5.0, 40.0 + wobble],
            SensorKind::Orientation => vec![0.0, 0.0, (n as f32 * 0.001) % 6.283],
        }
    }
}

impl SensorSource for MockImuSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorEventCallback) {
        // repeated listen is ignored
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let kind = self.kind;
        let config = self.config.clone();
        let listening = Arc::clone(&self.listening);
        let sent = Arc::clone(&self.sent);
        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            debug!(kind = ?kind, frequency_hz = config.frequency_hz, "mock imu started");

            let mut n = 0u64;
            while listening.load(Ordering::Acquire) {
                if config.max_events.is_some_and(|max| n >= max) {
                    break;
                }
                let elapsed = start.elapsed();
                let timestamp = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
                callback(SensorEvent::new(
                    kind,
                    timestamp,
                    Self::values(kind, n, elapsed.as_secs_f64()),
                ));
                n += 1;
                sent.store(n, Ordering::Release);
                trace!(kind = ?kind, n, "mock imu event sent");

                thread::sleep(interval);
            }

            debug!(kind = ?kind, events = n, "mock imu stopped");
        });

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(kind = ?self.kind, "mock imu thread panicked");
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }
}

impl Drop for MockImuSensor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_from_own_thread() {
        let sensor = MockImuSensor::new(
            SensorKind::Gyroscope,
            MockImuConfig {
                frequency_hz: 1000.0,
                max_events: Some(20),
            },
        );
        let caller = thread::current().id();
        let count = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&count);
        sensor.listen(Arc::new(move |event| {
            assert_eq!(event.kind, SensorKind::Gyroscope);
            assert_eq!(event.values.len(), 3);
            assert_ne!(thread::current().id(), caller);
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        // max_events ends the loop; stop joins the thread
        while sensor.sent() < 20 {
            thread::sleep(Duration::from_millis(1));
        }
        sensor.stop();
        assert_eq!(count.load(Ordering::Relaxed), 20);
        assert!(!sensor.is_listening());
    }

    #[test]
    fn test_repeated_listen_ignored() {
        let sensor = MockImuSensor::new(
            SensorKind::Accelerometer,
            MockImuConfig {
                frequency_hz: 1000.0,
                max_events: Some(5),
            },
        );
        let count = Arc::new(AtomicU64::new(0));
        let first = Arc::clone(&count);
        let second = Arc::clone(&count);
        sensor.listen(Arc::new(move |_| {
            first.fetch_add(1, Ordering::Relaxed);
        }));
        sensor.listen(Arc::new(move |_| {
            second.fetch_add(100, Ordering::Relaxed);
        }));

        while sensor.sent() < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        sensor.stop();
        assert_eq!(count.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_uncalibrated_carries_bias() {
        let values = MockImuSensor::values(SensorKind::AccelerometerUncalibrated, 0, 0.0);
        assert_eq!(values.len(), 6);
        assert_eq!(&values[3..], &[0.01, -0.02, 0.03]);
    }
}
