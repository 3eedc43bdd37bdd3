//! # Stream Registry
//!
//! Per-session map from logical stream key to an open, optionally
//! raw-deflate-compressed, append-only file.
//!
//! - Writes to one key are serialized; different keys never block each other
//! - Appending to a key that was never registered (or already closed) fails
//!   with [`RegistryError::UnknownStream`]
//! - [`StreamRegistry::close_all`] finishes every stream and is idempotent

mod error;
mod metrics;
mod registry;
mod writer;

pub use error::RegistryError;
pub use metrics::{StreamMetrics, StreamMetricsSnapshot};
pub use registry::StreamRegistry;
pub use writer::{Encoding, StreamWriter};
