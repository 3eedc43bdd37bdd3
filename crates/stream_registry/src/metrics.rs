//! Per-stream counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a single stream
#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// Successful appends
    append_count: AtomicU64,
    /// Uncompressed bytes handed to the writer
    bytes_written: AtomicU64,
    /// Failed appends
    failure_count: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_count(&self) -> u64 {
        self.append_count.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Record a successful append of `len` bytes
    pub fn record_append(&self, len: usize) {
        self.append_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            append_count: self.append_count(),
            bytes_written: self.bytes_written(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of stream counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    pub append_count: u64,
    pub bytes_written: u64,
    pub failure_count: u64,
}
