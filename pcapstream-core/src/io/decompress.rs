//! Compression detection and decompression support.
//!
//! [`DecompressReader<R>`] wraps the supported decoders behind one `Read`
//! implementation so capture readers never need to know whether the file
//! on disk was compressed.

use std::fs::File;
#[cfg(feature = "compress-zstd")]
use std::io::BufReader;
use std::io::{self, Read, Seek, SeekFrom};

use flate2::read::GzDecoder;

/// Detected compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression
    None,
    /// Gzip (.gz)
    Gzip,
    /// Zstandard (.zst)
    #[cfg(feature = "compress-zstd")]
    Zstd,
}

impl Compression {
    /// Detect compression format from magic bytes.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            // Gzip: 1f 8b 08 (deflate)
            [0x1f, 0x8b, 0x08, ..] => Compression::Gzip,

            // Zstd: 28 b5 2f fd
            #[cfg(feature = "compress-zstd")]
            [0x28, 0xb5, 0x2f, 0xfd, ..] => Compression::Zstd,

            _ => Compression::None,
        }
    }

    /// Check if this represents compressed data.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            #[cfg(feature = "compress-zstd")]
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Unified decompression reader.
///
/// Uses enum dispatch rather than trait objects; the `Read` implementation
/// delegates to the inner decoder.
pub enum DecompressReader<R: Read> {
    /// No compression - pass-through
    None(R),

    /// Gzip decompression
    Gzip(GzDecoder<R>),

    /// Zstandard decompression
    #[cfg(feature = "compress-zstd")]
    Zstd(zstd::Decoder<'static, BufReader<R>>),
}

impl<R: Read> DecompressReader<R> {
    /// Create a decompression reader with explicit compression format.
    pub fn new(source: R, compression: Compression) -> io::Result<Self> {
        match compression {
            Compression::None => Ok(DecompressReader::None(source)),
            Compression::Gzip => Ok(DecompressReader::Gzip(GzDecoder::new(source))),
            #[cfg(feature = "compress-zstd")]
            Compression::Zstd => Ok(DecompressReader::Zstd(zstd::Decoder::new(source)?)),
        }
    }

    /// Get the compression format this reader handles.
    pub fn compression(&self) -> Compression {
        match self {
            DecompressReader::None(_) => Compression::None,
            DecompressReader::Gzip(_) => Compression::Gzip,
            #[cfg(feature = "compress-zstd")]
            DecompressReader::Zstd(_) => Compression::Zstd,
        }
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressReader::None(r) => r.read(buf),
            DecompressReader::Gzip(r) => r.read(buf),
            #[cfg(feature = "compress-zstd")]
            DecompressReader::Zstd(r) => r.read(buf),
        }
    }
}

/// Type alias for file-based decompression.
pub type FileDecoder = DecompressReader<File>;

impl FileDecoder {
    /// Sniff the first bytes of `file` and wrap it in the matching decoder.
    ///
    /// The file is rewound before the decoder takes it over.
    pub fn from_file(mut file: File) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        let mut filled = 0;
        while filled < magic.len() {
            match file.read(&mut magic[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        let compression = Compression::detect(&magic[..filled]);
        file.seek(SeekFrom::Start(0))?;
        DecompressReader::new(file, compression)
    }
}
