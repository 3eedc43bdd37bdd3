//! SessionBundle - read back a finished session folder
//!
//! Used by the `inspect` command and the end-to-end tests.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use contracts::{FrameRecord, ImuChannel, ImuRecord, SessionMetadata, IMU_BINARY_RECORD_LEN};
use depth_codec::decode_range_stream;
use flate2::read::DeflateDecoder;

use crate::error::RecorderError;
use crate::header::{parse_header, PlyFormat};
use crate::layout::SessionLayout;

/// Decoded IMU file
#[derive(Debug, Clone, PartialEq)]
pub struct ImuTrack {
    pub channel: ImuChannel,
    /// Count declared by the header; `None` if the file has no header yet
    pub header_count: Option<u64>,
    pub records: Vec<ImuRecord>,
}

/// A session folder on disk
#[derive(Debug, Clone)]
pub struct SessionBundle {
    layout: SessionLayout,
}

impl SessionBundle {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RecorderError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(RecorderError::bundle(dir, "not a directory"));
        }
        let layout = SessionLayout::from_dir(&dir)
            .ok_or_else(|| RecorderError::bundle(&dir, "folder name is not valid UTF-8"))?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn id(&self) -> &str {
        self.layout.id()
    }

    pub fn metadata(&self) -> Result<SessionMetadata, RecorderError> {
        let text = fs::read_to_string(self.layout.metadata_path())?;
        Ok(serde_json::from_str(text.trim_end())?)
    }

    /// Per-frame camera records, in file order
    pub fn camera_info(&self) -> Result<Vec<FrameRecord>, RecorderError> {
        let text = fs::read_to_string(self.layout.camera_info_path())?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(RecorderError::from))
            .collect()
    }

    /// Range frames (millimetres), split by the depth resolution in the metadata
    pub fn depth_frames(&self) -> Result<Vec<Vec<u16>>, RecorderError> {
        let path = self.layout.depth_path();
        let bytes = inflate(&path)?;
        let pixels = self.depth_pixels()?;
        split_frames(&path, &bytes, pixels * 2)?
            .into_iter()
            .map(|frame| Ok(decode_range_stream(frame)))
            .collect()
    }

    /// Raw confidence frames
    pub fn confidence_frames(&self) -> Result<Vec<Vec<u8>>, RecorderError> {
        let path = self.layout.confidence_path();
        let bytes = inflate(&path)?;
        let pixels = self.depth_pixels()?;
        Ok(split_frames(&path, &bytes, pixels)?
            .into_iter()
            .map(<[u8]>::to_vec)
            .collect())
    }

    /// Binary IMU file of `channel`
    pub fn imu_track(&self, channel: ImuChannel) -> Result<ImuTrack, RecorderError> {
        let path = self.layout.imu_path(channel);
        let bytes = fs::read(&path)?;

        let (header_count, body) = match parse_header(&bytes) {
            Some(header) if header.format == PlyFormat::BinaryBigEndian => {
                (Some(header.count), &bytes[header.body_offset..])
            }
            Some(header) => {
                return Err(RecorderError::bundle(
                    &path,
                    format!("unexpected format {}", header.format.as_str()),
                ))
            }
            None => (None, &bytes[..]),
        };

        let records = split_frames(&path, body, IMU_BINARY_RECORD_LEN)?
            .into_iter()
            .filter_map(|record| ImuRecord::from_be_bytes(channel, record))
            .collect();

        Ok(ImuTrack {
            channel,
            header_count,
            records,
        })
    }

    /// Files in the bundle, sorted by name
    pub fn files(&self) -> Result<Vec<PathBuf>, RecorderError> {
        let mut files = fs::read_dir(self.layout.dir())?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        files.retain(|path| path.is_file());
        files.sort();
        Ok(files)
    }

    fn depth_pixels(&self) -> Result<usize, RecorderError> {
        let metadata = self.metadata()?;
        let [height, width] = metadata
            .stream("depth_back_1")
            .and_then(|stream| stream.resolution)
            .ok_or_else(|| {
                RecorderError::bundle(self.layout.metadata_path(), "missing depth resolution")
            })?;
        Ok(height as usize * width as usize)
    }
}

fn inflate(path: &Path) -> Result<Vec<u8>, RecorderError> {
    let mut out = Vec::new();
    DeflateDecoder::new(fs::File::open(path)?).read_to_end(&mut out)?;
    Ok(out)
}

fn split_frames<'a>(
    path: &Path,
    bytes: &'a [u8],
    frame_len: usize,
) -> Result<Vec<&'a [u8]>, RecorderError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    if frame_len == 0 || bytes.len() % frame_len != 0 {
        return Err(RecorderError::bundle(
            path,
            format!("{} bytes is not a multiple of {}", bytes.len(), frame_len),
        ));
    }
    Ok(bytes.chunks_exact(frame_len).collect())
}
