//! Capture I/O.
//!
//! A [`CaptureSource`] hands frames to a callback as borrowed [`RawFrame`]s.
//! The frame bytes live in the source's read buffer and are only valid for
//! the duration of the callback.
//!
//! - [`GenericPcapReader`] - PCAP/PCAPNG reader over any `Read`
//! - [`DecompressReader`] - transparent gzip (and optionally zstd) decoding
//! - [`PacketFilter`] - BPF filter evaluated in user space (`libpcap` feature)
//! - `LiveSource` - live interface capture (`libpcap` feature)

mod decompress;
mod filter;
#[cfg(feature = "libpcap")]
mod live;
mod pcap_stream;

pub use decompress::{Compression, DecompressReader, FileDecoder};
pub use filter::PacketFilter;
#[cfg(feature = "libpcap")]
pub use live::LiveSource;
pub use pcap_stream::{GenericPcapReader, PcapFormat};

use crate::error::CaptureError;
use crate::packet::{LinkType, Timestamp};

/// One captured frame as seen by the capture callback.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// 1-based position in the capture
    pub frame_number: u64,
    pub timestamp: Timestamp,
    pub captured_len: u32,
    /// Length on the wire, which may exceed `captured_len` under a snaplen
    pub original_len: u32,
    pub data: &'a [u8],
}

/// A source of captured frames.
///
/// The link type and snaplen are fixed once the source is open.
pub trait CaptureSource {
    /// Human-readable name (file path or device).
    fn name(&self) -> &str;

    fn link_type(&self) -> LinkType;

    fn snaplen(&self) -> u32;

    /// Install a BPF filter expression. Frames that do not match are never
    /// handed to [`dispatch`](Self::dispatch)'s callback.
    fn apply_filter(&mut self, expression: &str) -> Result<(), CaptureError>;

    /// Deliver every frame currently available to `handler`.
    ///
    /// File sources read to the end; live sources return when the read
    /// timeout expires. Returns the number of frames delivered.
    fn dispatch(&mut self, handler: &mut dyn FnMut(RawFrame<'_>)) -> Result<usize, CaptureError>;
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn link_type(&self) -> LinkType {
        (**self).link_type()
    }

    fn snaplen(&self) -> u32 {
        (**self).snaplen()
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), CaptureError> {
        (**self).apply_filter(expression)
    }

    fn dispatch(&mut self, handler: &mut dyn FnMut(RawFrame<'_>)) -> Result<usize, CaptureError> {
        (**self).dispatch(handler)
    }
}
