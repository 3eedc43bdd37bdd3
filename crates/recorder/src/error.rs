//! Recorder error types

use std::path::PathBuf;

use contracts::CaptureError;
use stream_registry::RegistryError;
use thiserror::Error;

/// Recorder-specific errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Collaborator / session error (from contract)
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Stream registry error
    #[error("stream error: {0}")]
    Registry(#[from] RegistryError),

    /// Record could not be serialized
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Background reconcile task failed
    #[error("reconcile task failed: {message}")]
    Join { message: String },

    /// Session bundle is unreadable or inconsistent
    #[error("bundle error at '{path}': {message}")]
    Bundle { path: PathBuf, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    /// Create a bundle error
    pub fn bundle(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Bundle {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Errors that end the session and must be shown to the user
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Capture(CaptureError::SessionFolder { .. })
                | Self::Capture(CaptureError::ArRuntime { .. })
        )
    }
}
