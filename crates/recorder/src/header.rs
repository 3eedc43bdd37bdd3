//! PLY-style headers on IMU files
//!
//! The record count is only known once the session ends, so the header is
//! prepended to the finished file.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use contracts::ImuChannel;

const END_HEADER: &str = "end_header\n";

/// Body encoding declared in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    BinaryBigEndian,
    Ascii,
}

impl PlyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryBigEndian => "binary_big_endian",
            Self::Ascii => "ascii",
        }
    }
}

/// Header text for `count` records of `channel`
pub fn imu_header(channel: ImuChannel, count: u64, format: PlyFormat) -> String {
    let mut header = format!(
        "ply\nformat {} 1.0\nelement {} {}\ncomment imu sensor data with timestamp\nproperty uint64 timestamp\n",
        format.as_str(),
        channel.full_name(),
        count
    );
    for axis in channel.axis_names() {
        header.push_str("property double ");
        header.push_str(axis);
        header.push('\n');
    }
    header.push_str(END_HEADER);
    header
}

/// Rewrite `path` as `header` followed by its previous content
pub fn prepend_header(path: &Path, header: &str) -> io::Result<()> {
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));
    let mut body = BufReader::new(File::open(path)?);
    let written = (|| {
        let mut out = BufWriter::new(File::create(&tmp)?);
        out.write_all(header.as_bytes())?;
        io::copy(&mut body, &mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)
}

/// Parsed header: element count and the byte offset of the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub format: PlyFormat,
    pub element: String,
    pub count: u64,
    pub body_offset: usize,
}

/// Parse a header at the start of `bytes`; `None` if there is none
pub fn parse_header(bytes: &[u8]) -> Option<ParsedHeader> {
    if !bytes.starts_with(b"ply\n") {
        return None;
    }
    let end = find(bytes, END_HEADER.as_bytes())? + END_HEADER.len();
    let text = std::str::from_utf8(&bytes[..end]).ok()?;

    let mut format = None;
    let mut element = None;
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("format") => {
                format = match parts.next() {
                    Some("binary_big_endian") => Some(PlyFormat::BinaryBigEndian),
                    Some("ascii") => Some(PlyFormat::Ascii),
                    _ => None,
                };
            }
            Some("element") => {
                let name = parts.next()?.to_string();
                let count = parts.next()?.parse().ok()?;
                element = Some((name, count));
            }
            _ => {}
        }
    }

    let (element, count) = element?;
    Some(ParsedHeader {
        format: format?,
        element,
        count,
        body_offset: end,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_gyro_header() {
        let header = imu_header(ImuChannel::Gyro, 30, PlyFormat::BinaryBigEndian);
        assert_eq!(
            header,
            "ply\nformat binary_big_endian 1.0\nelement rotation 30\n\
             comment imu sensor data with timestamp\nproperty uint64 timestamp\n\
             property double x\nproperty double y\nproperty double z\nend_header\n"
        );
    }

    #[test]
    fn test_orientation_uses_euler_axes() {
        let header = imu_header(ImuChannel::Orientation, 0, PlyFormat::Ascii);
        assert!(header.contains("format ascii 1.0"));
        assert!(header.contains("element attitude 0"));
        assert!(header.contains("property double roll\nproperty double pitch\nproperty double yaw\n"));
    }

    #[test]
    fn test_prepend_and_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.acce");
        fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let header = imu_header(ImuChannel::Accel, 50, PlyFormat::BinaryBigEndian);
        prepend_header(&path, &header).unwrap();

        let bytes = fs::read(&path).unwrap();
        let parsed = parse_header(&bytes).unwrap();
        assert_eq!(parsed.count, 50);
        assert_eq!(parsed.element, "accelerometer");
        assert_eq!(parsed.format, PlyFormat::BinaryBigEndian);
        assert_eq!(&bytes[parsed.body_offset..], &[1, 2, 3, 4]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_no_header() {
        assert!(parse_header(&[0, 0, 0, 1]).is_none());
        assert!(parse_header(b"ply\nformat ascii 1.0\n").is_none());
    }
}
