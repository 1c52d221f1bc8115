//! Capture file source with automatic compression handling.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::error::CaptureError;
use crate::io::{CaptureSource, FileDecoder, GenericPcapReader, PacketFilter, RawFrame};
use crate::packet::LinkType;

/// Capture source for PCAP and PCAPNG data, with optional decompression.
///
/// This is a thin wrapper around [`GenericPcapReader`] that adds:
/// - File opening with path-based API
/// - Automatic compression detection (gzip, and zstd with `compress-zstd`)
/// - A user-space BPF filter (`libpcap` feature)
///
/// # Example
///
/// ```no_run
/// use pcapstream_core::io::CaptureSource;
/// use pcapstream_core::pcap::PcapSource;
///
/// let mut source = PcapSource::open("capture.pcap.gz").unwrap();
/// source
///     .dispatch(&mut |frame| println!("Frame {}: {} bytes", frame.frame_number, frame.data.len()))
///     .unwrap();
/// ```
pub struct PcapSource<R: Read = FileDecoder> {
    name: String,
    reader: GenericPcapReader<R>,
    filter: Option<PacketFilter>,
    filtered_out: u64,
}

impl PcapSource<FileDecoder> {
    /// Open a capture file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let name = path.display().to_string();

        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CaptureError::FileNotFound { path: name.clone() },
            _ => CaptureError::Open {
                source_name: name.clone(),
                reason: e.to_string(),
            },
        })?;
        let decoder = FileDecoder::from_file(file).map_err(|e| CaptureError::Open {
            source_name: name.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %name, compression = %decoder.compression(), "opening capture file");

        Self::from_reader(name, decoder)
    }
}

impl<R: Read> PcapSource<R> {
    /// Read a capture from any byte stream; `name` is used in logs and errors.
    pub fn from_reader(name: impl Into<String>, reader: R) -> Result<Self, CaptureError> {
        let name = name.into();
        let reader = GenericPcapReader::new(reader)?;
        info!(
            source = %name,
            link_type = %reader.link_type(),
            snaplen = reader.snaplen(),
            "capture source opened"
        );
        Ok(PcapSource {
            name,
            reader,
            filter: None,
            filtered_out: 0,
        })
    }

    /// Frames rejected by the filter so far.
    pub fn filtered_out(&self) -> u64 {
        self.filtered_out
    }

    /// Frames read so far, including filtered ones.
    pub fn frame_count(&self) -> u64 {
        self.reader.frame_count()
    }
}

impl<R: Read> CaptureSource for PcapSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn link_type(&self) -> LinkType {
        self.reader.link_type()
    }

    fn snaplen(&self) -> u32 {
        self.reader.snaplen()
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), CaptureError> {
        let filter = PacketFilter::compile(expression, self.reader.link_type(), &self.name)?;
        debug!(source = %self.name, expression, "filter compiled");
        self.filter = Some(filter);
        Ok(())
    }

    fn dispatch(&mut self, handler: &mut dyn FnMut(RawFrame<'_>)) -> Result<usize, CaptureError> {
        let filter = self.filter.as_ref();
        let filtered_out = &mut self.filtered_out;
        let mut delivered = 0;
        self.reader.dispatch_frames(|frame| {
            if filter.map_or(true, |f| f.matches(frame.data)) {
                handler(frame);
                delivered += 1;
            } else {
                *filtered_out += 1;
            }
        })?;
        Ok(delivered)
    }
}
