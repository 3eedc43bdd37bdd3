//! StreamRegistry - key -> writer map shared by every producer of a session

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use contracts::StreamKey;
use tracing::{debug, error, instrument, warn};

use crate::error::RegistryError;
use crate::metrics::{StreamMetrics, StreamMetricsSnapshot};
use crate::writer::{Encoding, StreamWriter};

/// One registered stream: its file, writer and counters
struct StreamSlot {
    path: PathBuf,
    encoding: Encoding,
    /// `None` once the stream has been closed
    writer: Mutex<Option<StreamWriter>>,
    metrics: StreamMetrics,
}

impl StreamSlot {
    fn new(path: &Path, writer: StreamWriter) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding: writer.encoding(),
            writer: Mutex::new(Some(writer)),
            metrics: StreamMetrics::new(),
        }
    }

    fn finish(&self, key: &StreamKey) -> Result<(), RegistryError> {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(writer) = writer else {
            return Ok(());
        };

        match writer.finish() {
            Ok(()) => {
                debug!(
                    key = %key,
                    appends = self.metrics.append_count(),
                    bytes = self.metrics.bytes_written(),
                    "Stream closed"
                );
                Ok(())
            }
            Err(e) => {
                error!(key = %key, path = %self.path.display(), error = %e, "Failed to close stream");
                Err(RegistryError::io(key, e))
            }
        }
    }
}

/// Registry of the open streams of one session
///
/// The map lock is only held to look up (or insert/drain) slots; the actual
/// write happens under the slot's own mutex, so producers on different keys
/// proceed in parallel.
#[derive(Default)]
pub struct StreamRegistry {
    streams: RwLock<HashMap<StreamKey, Arc<StreamSlot>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` for append under `key`.
    ///
    /// The file is created if absent. Nothing is touched on disk when `key`
    /// is already registered.
    #[instrument(
        name = "stream_registry_register",
        skip(self, key, path),
        fields(key = %key, path = %path.as_ref().display(), encoding = ?encoding)
    )]
    pub fn register(
        &self,
        key: impl Into<StreamKey> + std::fmt::Display,
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        let path = path.as_ref();

        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        if streams.contains_key(&key) {
            return Err(RegistryError::DuplicateStream(key));
        }

        let writer = StreamWriter::open(path, encoding).map_err(|e| RegistryError::io(&key, e))?;
        streams.insert(key, Arc::new(StreamSlot::new(path, writer)));
        debug!("Stream registered");
        Ok(())
    }

    /// Register an already open writer under `key`.
    ///
    /// `path` is only reported back by [`path_of`](Self::path_of).
    pub fn register_writer(
        &self,
        key: impl Into<StreamKey>,
        path: impl AsRef<Path>,
        writer: StreamWriter,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        if streams.contains_key(&key) {
            return Err(RegistryError::DuplicateStream(key));
        }
        debug!(key = %key, encoding = ?writer.encoding(), "Writer registered");
        streams.insert(key, Arc::new(StreamSlot::new(path.as_ref(), writer)));
        Ok(())
    }

    /// Append raw bytes to `key`
    pub fn append(&self, key: &str, bytes: &[u8]) -> Result<(), RegistryError> {
        let slot = self.slot(key)?;
        let mut guard = slot.writer.lock().unwrap_or_else(PoisonError::into_inner);

        // closed between lookup and lock
        let Some(writer) = guard.as_mut() else {
            return Err(RegistryError::UnknownStream(key.into()));
        };

        match writer.append(bytes) {
            Ok(()) => {
                slot.metrics.record_append(bytes.len());
                Ok(())
            }
            Err(e) => {
                slot.metrics.inc_failure_count();
                Err(RegistryError::io(&key.into(), e))
            }
        }
    }

    /// Append `text` followed by a newline
    pub fn append_line(&self, key: &str, text: &str) -> Result<(), RegistryError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.append(key, line.as_bytes())
    }

    /// Finish and close every stream, then forget all keys.
    ///
    /// Every stream is closed even if some fail; the first failure is
    /// returned. Calling it again is a no-op.
    #[instrument(name = "stream_registry_close_all", skip(self))]
    pub fn close_all(&self) -> Result<(), RegistryError> {
        let drained: Vec<_> = {
            let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
            streams.drain().collect()
        };

        let mut first_error = None;
        for (key, slot) in drained {
            if let Err(e) = slot.finish(&key) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Finish one stream and forget its key; `UnknownStream` if not registered
    pub fn close(&self, key: &str) -> Result<(), RegistryError> {
        let slot = self
            .streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .ok_or_else(|| RegistryError::UnknownStream(key.into()))?;
        slot.finish(&key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<_> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys
    }

    pub fn len(&self) -> usize {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File behind `key`
    pub fn path_of(&self, key: &str) -> Option<PathBuf> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|slot| slot.path.clone())
    }

    pub fn encoding_of(&self, key: &str) -> Option<Encoding> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|slot| slot.encoding)
    }

    /// Counters of every registered stream
    pub fn metrics(&self) -> Vec<(StreamKey, StreamMetricsSnapshot)> {
        let mut out: Vec<_> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, slot)| (key.clone(), slot.metrics.snapshot()))
            .collect();
        out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        out
    }

    /// Counters of one stream
    pub fn metrics_of(&self, key: &str) -> Option<StreamMetricsSnapshot> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|slot| slot.metrics.snapshot())
    }

    fn slot(&self, key: &str) -> Result<Arc<StreamSlot>, RegistryError> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        match streams.get(key) {
            Some(slot) => Ok(Arc::clone(slot)),
            None => {
                warn!(key, "Append to unregistered stream");
                Err(RegistryError::UnknownStream(key.into()))
            }
        }
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_append_before_register_creates_nothing() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();

        let err = registry.append("confidence", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownStream(ref k) if k == "confidence"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();
        let path = dir.path().join("s.jsonl");

        registry.register("camera_info", &path, Encoding::Plain).unwrap();
        registry.append_line("camera_info", "{}").unwrap();

        let other = dir.path().join("other.jsonl");
        let err = registry
            .register("camera_info", &other, Encoding::Plain)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateStream(_)));
        assert!(!other.exists());
        assert_eq!(registry.path_of("camera_info"), Some(path));
    }

    #[test]
    fn test_close_all_is_idempotent() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();
        registry
            .register("depth", dir.path().join("s.depth.zlib"), Encoding::Deflate)
            .unwrap();
        registry
            .register("acce", dir.path().join("s.acce"), Encoding::Plain)
            .unwrap();
        registry.append("depth", &[0u8; 64]).unwrap();

        registry.close_all().unwrap();
        assert!(registry.is_empty());
        registry.close_all().unwrap();

        let err = registry.append("depth", &[0u8; 2]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownStream(_)));
    }

    #[test]
    fn test_per_key_order_under_concurrency() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(StreamRegistry::new());
        let path = dir.path().join("s.gyro");
        registry.register("gyro", &path, Encoding::Plain).unwrap();
        registry
            .register("acce", dir.path().join("s.acce"), Encoding::Plain)
            .unwrap();

        // gyro: one producer, strictly increasing records; acce: noise on other threads
        let producer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0u32..500 {
                    registry.append("gyro", &i.to_be_bytes()).unwrap();
                }
            })
        };
        let noise: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..200 {
                        registry.append("acce", &[0xAA; 32]).unwrap();
                    }
                })
            })
            .collect();

        producer.join().unwrap();
        for handle in noise {
            handle.join().unwrap();
        }

        let metrics = registry.metrics();
        let acce = metrics.iter().find(|(k, _)| k == "acce").unwrap().1;
        assert_eq!(acce.append_count, 800);
        assert_eq!(acce.bytes_written, 800 * 32);

        registry.close_all().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let values: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_keys_sorted() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();
        for key in ["metadata", "camera_info", "depth"] {
            registry
                .register(key, dir.path().join(key), Encoding::Plain)
                .unwrap();
        }
        let keys: Vec<_> = registry.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["camera_info", "depth", "metadata"]);
        assert!(registry.contains("depth"));
        assert_eq!(registry.encoding_of("depth"), Some(Encoding::Plain));
        registry.close_all().unwrap();
    }

    /// fails the first `failures` writes, then collects into `out`
    struct FlakySink {
        failures: usize,
        out: Arc<Mutex<Vec<u8>>>,
    }

    impl std::io::Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(std::io::Error::other("disk full"));
            }
            self.out.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_replace_one_stream_with_writer() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();
        let path = dir.path().join("s.confidence.zlib");
        registry.register("confidence", &path, Encoding::Deflate).unwrap();
        registry
            .register("depth", dir.path().join("s.depth.zlib"), Encoding::Deflate)
            .unwrap();

        registry.close("confidence").unwrap();
        assert!(!registry.contains("confidence"));
        assert!(registry.contains("depth"));
        assert!(matches!(
            registry.close("confidence").unwrap_err(),
            RegistryError::UnknownStream(_)
        ));

        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = FlakySink {
            failures: 1,
            out: Arc::clone(&out),
        };
        registry
            .register_writer("confidence", &path, StreamWriter::sink(sink))
            .unwrap();
        assert_eq!(registry.encoding_of("confidence"), Some(Encoding::Plain));

        let err = registry.append("confidence", &[1, 2]).unwrap_err();
        assert!(err.is_io());
        registry.append("confidence", &[3, 4]).unwrap();

        let metrics = registry.metrics_of("confidence").unwrap();
        assert_eq!(metrics.append_count, 1);
        assert_eq!(metrics.failure_count, 1);
        assert!(registry.metrics_of("gyro").is_none());

        registry.close_all().unwrap();
        assert_eq!(*out.lock().unwrap(), vec![3, 4]);
    }
}
