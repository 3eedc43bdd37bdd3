//! Layered error definitions
//!
//! Categorized by source: config / session / collaborator / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum CaptureError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Session Errors =====
    /// Session folder could not be created (user-facing, ends the session)
    #[error("cannot create session folder '{path}': {message}")]
    SessionFolder { path: String, message: String },

    /// A session is already recording on this controller
    #[error("session '{folder_id}' is already active")]
    SessionActive { folder_id: String },

    /// Stop requested without an active session
    #[error("no active session")]
    NoActiveSession,

    // ===== Collaborator Errors =====
    /// AR runtime unavailable (user-facing, ends the session)
    #[error("ar runtime error: {message}")]
    ArRuntime { message: String },

    /// Per-frame image acquisition failed (transient)
    #[error("{image} image not available: {message}")]
    Acquisition { image: ImageKind, message: String },

    /// Video container could not report its frame count
    #[error("video container error: {message}")]
    VideoContainer { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Which per-frame image an acquisition error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Depth,
    Confidence,
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Depth => write!(f, "depth"),
            Self::Confidence => write!(f, "confidence"),
        }
    }
}

impl CaptureError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create acquisition error
    pub fn acquisition(image: ImageKind, message: impl Into<String>) -> Self {
        Self::Acquisition {
            image,
            message: message.into(),
        }
    }

    /// Create video container error
    pub fn video_container(message: impl Into<String>) -> Self {
        Self::VideoContainer {
            message: message.into(),
        }
    }

    /// Transient errors are skipped by the recorders instead of surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Acquisition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_is_transient() {
        let err = CaptureError::acquisition(ImageKind::Depth, "not yet available");
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "depth image not available: not yet available"
        );
        assert!(!CaptureError::NoActiveSession.is_transient());
    }
}
