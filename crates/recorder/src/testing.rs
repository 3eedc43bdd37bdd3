//! Fault injection for recorder tests

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use stream_registry::StreamWriter;

use crate::session::Session;

/// Fails the first `failures` writes, then collects everything into `out`
pub(crate) struct FlakySink {
    failures: usize,
    out: Arc<Mutex<Vec<u8>>>,
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::other("no space left on device"));
        }
        self.out.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Swap `key` of a running session for a sink failing `failures` times.
/// Returns what the sink received.
pub(crate) fn flaky_stream(session: &Session, key: &str, failures: usize) -> Arc<Mutex<Vec<u8>>> {
    let registry = session.registry();
    let path = registry.path_of(key).unwrap();
    registry.close(key).unwrap();

    let out = Arc::new(Mutex::new(Vec::new()));
    let sink = FlakySink {
        failures,
        out: Arc::clone(&out),
    };
    registry
        .register_writer(key, path, StreamWriter::sink(sink))
        .unwrap();
    out
}
