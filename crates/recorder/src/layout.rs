//! Session bundle layout
//!
//! A session lives in `<output_dir>/<id>/` where `id` is
//! `<yyyyMMdd'T'HHmmssZ>_<deviceId>`; every file inside is named `<id><suffix>`.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use contracts::{CaptureConfig, CaptureError, ImuChannel, StreamKey};
use stream_registry::Encoding;

/// Stream keys used by the recorders
pub mod keys {
    pub const DEPTH: &str = "depth";
    pub const CONFIDENCE: &str = "confidence";
    pub const CAMERA_INFO: &str = "camera_info";
    pub const METADATA: &str = "metadata";
    pub const DEPTH_DEBUG: &str = "depth_debug";
    pub const CONFIDENCE_DEBUG: &str = "confidence_debug";
}

/// Folder timestamp format, e.g. `20240501T101530+0200`
pub const FOLDER_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%z";

/// One stream to register when a session opens
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStream {
    pub key: StreamKey,
    pub path: PathBuf,
    pub encoding: Encoding,
}

/// Paths of one session bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    dir: PathBuf,
    id: String,
}

impl SessionLayout {
    /// `<timestamp>_<deviceId>`
    pub fn folder_id<Tz>(now: &DateTime<Tz>, device_id: &str) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!("{}_{}", now.format(FOLDER_TIME_FORMAT), device_id)
    }

    pub fn new(output_dir: impl AsRef<Path>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            dir: output_dir.as_ref().join(&id),
            id,
        }
    }

    /// Layout of an existing bundle directory
    pub fn from_dir(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        let id = dir.file_name()?.to_str()?.to_string();
        Some(Self { dir, id })
    }

    /// Create the session directory. Fails if it already exists.
    pub fn create(&self) -> Result<(), CaptureError> {
        let folder_error = |message: String| CaptureError::SessionFolder {
            path: self.dir.display().to_string(),
            message,
        };
        if let Some(parent) = self.dir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| folder_error(e.to_string()))?;
        }
        std::fs::create_dir(&self.dir).map_err(|e| folder_error(e.to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `<dir>/<id><suffix>`
    pub fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.id, suffix))
    }

    pub fn depth_path(&self) -> PathBuf {
        self.file(".depth.zlib")
    }

    pub fn confidence_path(&self) -> PathBuf {
        self.file(".confidence.zlib")
    }

    pub fn camera_info_path(&self) -> PathBuf {
        self.file(".jsonl")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.file(".json")
    }

    pub fn video_path(&self) -> PathBuf {
        self.file(".mp4")
    }

    pub fn imu_path(&self, channel: ImuChannel) -> PathBuf {
        self.file(&format!(".{}", channel.short_name()))
    }

    pub fn imu_ascii_path(&self, channel: ImuChannel) -> PathBuf {
        self.file(&format!(".{}_ascii", channel.short_name()))
    }

    pub fn depth_debug_path(&self) -> PathBuf {
        self.file("_depth.txt")
    }

    pub fn confidence_debug_path(&self) -> PathBuf {
        self.file("_confidence.txt")
    }

    /// Every stream a session with `config` writes
    pub fn stream_plan(&self, config: &CaptureConfig) -> Vec<PlannedStream> {
        let plan = |key: &str, path: PathBuf, encoding: Encoding| PlannedStream {
            key: StreamKey::from(key),
            path,
            encoding,
        };

        let mut streams = vec![
            plan(keys::DEPTH, self.depth_path(), Encoding::Deflate),
            plan(keys::CONFIDENCE, self.confidence_path(), Encoding::Deflate),
            plan(keys::CAMERA_INFO, self.camera_info_path(), Encoding::Plain),
            plan(keys::METADATA, self.metadata_path(), Encoding::Plain),
        ];

        for channel in &config.imu.channels {
            streams.push(PlannedStream {
                key: channel.key(),
                path: self.imu_path(*channel),
                encoding: Encoding::Plain,
            });
            if config.session.debug {
                streams.push(PlannedStream {
                    key: channel.ascii_key(),
                    path: self.imu_ascii_path(*channel),
                    encoding: Encoding::Plain,
                });
            }
        }

        if config.session.debug {
            streams.push(plan(keys::DEPTH_DEBUG, self.depth_debug_path(), Encoding::Plain));
            streams.push(plan(
                keys::CONFIDENCE_DEBUG,
                self.confidence_debug_path(),
                Encoding::Plain,
            ));
        }

        streams
    }
}
