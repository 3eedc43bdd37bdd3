//! Registry error types

use contracts::StreamKey;
use thiserror::Error;

/// Stream registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Append to a key that is not registered (never, or no longer)
    #[error("unknown stream '{0}'")]
    UnknownStream(StreamKey),

    /// Register of a key that already has a writer
    #[error("stream '{0}' is already registered")]
    DuplicateStream(StreamKey),

    /// Underlying file error
    #[error("io error on stream '{key}': {source}")]
    Io {
        key: StreamKey,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Create an IO error bound to a stream
    pub fn io(key: &StreamKey, source: std::io::Error) -> Self {
        Self::Io {
            key: key.clone(),
            source,
        }
    }

    /// The stream this error refers to
    pub fn key(&self) -> &StreamKey {
        match self {
            Self::UnknownStream(key) | Self::DuplicateStream(key) => key,
            Self::Io { key, .. } => key,
        }
    }

    /// I/O failures drop one record; the session keeps going.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
