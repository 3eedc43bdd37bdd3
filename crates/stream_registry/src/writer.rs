//! StreamWriter - append-only file, plain or raw deflate

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Compression;

/// On-disk encoding of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Bytes written as given
    Plain,
    /// One continuous raw deflate stream (no zlib header) for the whole file
    Deflate,
}

/// Open writer behind one stream key
pub enum StreamWriter {
    Plain(BufWriter<File>),
    Deflate(DeflateEncoder<BufWriter<File>>),
    /// Caller-supplied sink, written as given
    Sink(Box<dyn Write + Send>),
}

impl StreamWriter {
    /// Create the file if absent and open it for append
    pub fn open(path: &Path, encoding: Encoding) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let buffered = BufWriter::new(file);
        Ok(match encoding {
            Encoding::Plain => Self::Plain(buffered),
            Encoding::Deflate => Self::Deflate(DeflateEncoder::new(buffered, Compression::default())),
        })
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Plain(_) | Self::Sink(_) => Encoding::Plain,
            Self::Deflate(_) => Encoding::Deflate,
        }
    }

    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.write_all(bytes),
            Self::Deflate(w) => w.write_all(bytes),
            Self::Sink(w) => w.write_all(bytes),
        }
    }

    pub fn sink(writer: impl Write + Send + 'static) -> Self {
        Self::Sink(Box::new(writer))
    }

    /// Terminate the deflate stream (if any) and flush to disk
    pub fn finish(self) -> io::Result<()> {
        let buffered = match self {
            Self::Plain(w) => w,
            Self::Deflate(w) => w.finish()?,
            Self::Sink(mut w) => return w.flush(),
        };
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}
