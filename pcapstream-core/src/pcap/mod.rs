//! Capture file reading.
//!
//! [`PcapSource`] opens PCAP and PCAPNG files (optionally gzip or zstd
//! compressed) and implements [`CaptureSource`](crate::io::CaptureSource).

mod reader;

pub use reader::PcapSource;
