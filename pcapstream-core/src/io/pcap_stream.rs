//! Generic PCAP/PCAPNG reader over any Read source.
//!
//! Built on the `pcap_parser` crate. The reader is primed when it is
//! created: the file header (legacy) or the first interface description
//! (pcapng) is consumed up front, so the link type and snaplen are known
//! before the first frame is read.
//!
//! ## Usage
//!
//! ```ignore
//! let file = File::open("capture.pcap")?;
//! let mut reader = GenericPcapReader::new(file)?;
//! println!("link type {}", reader.link_type());
//! reader.dispatch_frames(|frame| println!("{} bytes", frame.data.len()))?;
//! ```

use std::io::{self, Cursor, Read};

use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError as PcapParserError, PcapNGReader};
use tracing::{debug, warn};

use super::RawFrame;
use crate::error::CaptureError;
use crate::packet::{LinkType, Timestamp};

/// Buffer size for pcap_parser readers (256KB).
const BUFFER_SIZE: usize = 262144;

/// Snaplen reported when the file does not carry one.
const DEFAULT_SNAPLEN: u32 = 65535;

/// pcapng's default timestamp resolution is microseconds.
const DEFAULT_TICKS_PER_SEC: u64 = 1_000_000;

/// Format of the capture file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcapFormat {
    /// Classic PCAP (little-endian, microseconds)
    LegacyLeMicro,
    /// Classic PCAP (big-endian, microseconds)
    LegacyBeMicro,
    /// Classic PCAP (little-endian, nanoseconds)
    LegacyLeNano,
    /// Classic PCAP (big-endian, nanoseconds)
    LegacyBeNano,
    /// PCAPNG format
    PcapNg,
}

impl PcapFormat {
    /// Detect the capture format from the first four bytes on disk.
    pub fn detect(data: &[u8]) -> Result<Self, CaptureError> {
        let magic: [u8; 4] = data
            .get(..4)
            .and_then(|m| m.try_into().ok())
            .ok_or_else(|| invalid("data too small for a capture magic"))?;

        match u32::from_le_bytes(magic) {
            0xa1b2c3d4 => Ok(PcapFormat::LegacyLeMicro),
            0xd4c3b2a1 => Ok(PcapFormat::LegacyBeMicro),
            0xa1b23c4d => Ok(PcapFormat::LegacyLeNano),
            0x4d3cb2a1 => Ok(PcapFormat::LegacyBeNano),
            0x0a0d0d0a => Ok(PcapFormat::PcapNg),
            other => Err(invalid(format!("unknown capture magic: 0x{:08x}", other))),
        }
    }

    /// Whether this is a PCAPNG format.
    pub fn is_pcapng(&self) -> bool {
        matches!(self, PcapFormat::PcapNg)
    }

    /// Whether legacy record timestamps carry nanoseconds.
    pub fn is_nanosecond(&self) -> bool {
        matches!(self, PcapFormat::LegacyLeNano | PcapFormat::LegacyBeNano)
    }
}

/// The sniffed magic bytes put back in front of the rest of the stream.
type Primed<R> = io::Chain<Cursor<[u8; 4]>, R>;

/// Generic PCAP/PCAPNG reader over any Read source.
pub struct GenericPcapReader<R: Read> {
    inner: ReaderInner<R>,
    format: PcapFormat,
    frame_number: u64,
    link_type: LinkType,
    snaplen: u32,
    /// Timestamp ticks per second, indexed by pcapng interface id.
    interfaces: Vec<u64>,
}

/// Inner reader using enum dispatch for format-specific handling.
enum ReaderInner<R: Read> {
    Legacy(LegacyPcapReader<Primed<R>>),
    Ng(PcapNGReader<Primed<R>>),
}

impl<R: Read> GenericPcapReader<R> {
    /// Sniff the format, open the matching reader and consume the headers.
    pub fn new(mut source: R) -> Result<Self, CaptureError> {
        let mut magic = [0u8; 4];
        source
            .read_exact(&mut magic)
            .map_err(|_| invalid("capture too short to read the magic number"))?;
        let format = PcapFormat::detect(&magic)?;
        let primed = Cursor::new(magic).chain(source);

        let inner = if format.is_pcapng() {
            let reader = PcapNGReader::new(BUFFER_SIZE, primed)
                .map_err(|e| invalid(format!("failed to parse PCAPNG: {}", e)))?;
            ReaderInner::Ng(reader)
        } else {
            let reader = LegacyPcapReader::new(BUFFER_SIZE, primed)
                .map_err(|e| invalid(format!("failed to parse legacy PCAP: {}", e)))?;
            ReaderInner::Legacy(reader)
        };

        let mut reader = GenericPcapReader {
            inner,
            format,
            frame_number: 0,
            link_type: LinkType::ETHERNET,
            snaplen: DEFAULT_SNAPLEN,
            interfaces: Vec::new(),
        };
        reader.prime()?;
        debug!(
            format = ?reader.format,
            link_type = %reader.link_type,
            snaplen = reader.snaplen,
            "capture headers read"
        );
        Ok(reader)
    }

    fn prime(&mut self) -> Result<(), CaptureError> {
        match &mut self.inner {
            ReaderInner::Legacy(reader) => loop {
                match reader.next() {
                    Ok((offset, PcapBlockOwned::LegacyHeader(header))) => {
                        self.link_type = LinkType(header.network.0 as u16);
                        self.snaplen = header.snaplen;
                        reader.consume(offset);
                        return Ok(());
                    }
                    Ok(_) => return Err(invalid("legacy PCAP without a file header")),
                    Err(PcapParserError::Incomplete(_)) => refill_legacy(reader)?,
                    Err(e) => return Err(invalid(format!("legacy PCAP header: {}", e))),
                }
            },
            ReaderInner::Ng(reader) => loop {
                match reader.next() {
                    Ok((offset, PcapBlockOwned::NG(Block::InterfaceDescription(idb)))) => {
                        self.link_type = LinkType(idb.linktype.0 as u16);
                        if idb.snaplen != 0 {
                            self.snaplen = idb.snaplen;
                        }
                        self.interfaces.push(ticks_per_sec(idb.if_tsresol));
                        reader.consume(offset);
                        return Ok(());
                    }
                    Ok((_, PcapBlockOwned::NG(Block::EnhancedPacket(_))))
                    | Ok((_, PcapBlockOwned::NG(Block::SimplePacket(_)))) => {
                        return Err(invalid("PCAPNG packet before any interface description"));
                    }
                    Ok((offset, _)) => reader.consume(offset),
                    Err(PcapParserError::Eof) => return Ok(()),
                    Err(PcapParserError::Incomplete(_)) => refill_ng(reader)?,
                    Err(e) => return Err(invalid(format!("PCAPNG header: {}", e))),
                }
            },
        }
    }

    /// Link type negotiated from the file headers.
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    pub fn format(&self) -> PcapFormat {
        self.format
    }

    /// Number of frames read so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Hand every remaining frame to `f` with zero-copy borrowed data.
    ///
    /// The borrow is valid only during the callback; the record is
    /// consumed from the read buffer once the callback returns.
    /// Returns the number of frames delivered.
    pub fn dispatch_frames<F>(&mut self, mut f: F) -> Result<usize, CaptureError>
    where
        F: FnMut(RawFrame<'_>),
    {
        let mut count = 0;
        match &mut self.inner {
            ReaderInner::Legacy(reader) => loop {
                match reader.next() {
                    Ok((offset, PcapBlockOwned::Legacy(packet))) => {
                        self.frame_number += 1;
                        let timestamp = if self.format.is_nanosecond() {
                            Timestamp::from_nanos(
                                packet.ts_sec as i64 * 1_000_000_000 + packet.ts_usec as i64,
                            )
                        } else {
                            Timestamp::new(packet.ts_sec as i64, packet.ts_usec)
                        };
                        f(RawFrame {
                            frame_number: self.frame_number,
                            timestamp,
                            captured_len: packet.caplen,
                            original_len: packet.origlen,
                            data: packet.data,
                        });
                        reader.consume(offset);
                        count += 1;
                    }
                    Ok((offset, _)) => reader.consume(offset),
                    Err(PcapParserError::Eof) => break,
                    Err(PcapParserError::Incomplete(_)) => refill_legacy(reader)?,
                    Err(e) => return Err(invalid(format!("legacy PCAP parse error: {}", e))),
                }
            },
            ReaderInner::Ng(reader) => loop {
                match reader.next() {
                    Ok((offset, PcapBlockOwned::NG(block))) => {
                        match block {
                            Block::InterfaceDescription(idb) => {
                                let link_type = LinkType(idb.linktype.0 as u16);
                                if link_type != self.link_type {
                                    warn!(
                                        interface = self.interfaces.len(),
                                        %link_type,
                                        capture_link_type = %self.link_type,
                                        "additional interface has a different link type"
                                    );
                                }
                                self.interfaces.push(ticks_per_sec(idb.if_tsresol));
                            }
                            Block::EnhancedPacket(epb) => {
                                self.frame_number += 1;
                                let ticks = ((epb.ts_high as u64) << 32) | epb.ts_low as u64;
                                let per_sec = self
                                    .interfaces
                                    .get(epb.if_id as usize)
                                    .copied()
                                    .unwrap_or(DEFAULT_TICKS_PER_SEC);
                                f(RawFrame {
                                    frame_number: self.frame_number,
                                    timestamp: ticks_to_timestamp(ticks, per_sec),
                                    captured_len: epb.caplen,
                                    original_len: epb.origlen,
                                    data: epb.data,
                                });
                                count += 1;
                            }
                            Block::SimplePacket(spb) => {
                                self.frame_number += 1;
                                f(RawFrame {
                                    frame_number: self.frame_number,
                                    timestamp: Timestamp::ZERO,
                                    captured_len: spb.data.len() as u32,
                                    original_len: spb.origlen,
                                    data: spb.data,
                                });
                                count += 1;
                            }
                            _ => {}
                        }
                        reader.consume(offset);
                    }
                    Ok((offset, _)) => reader.consume(offset),
                    Err(PcapParserError::Eof) => break,
                    Err(PcapParserError::Incomplete(_)) => refill_ng(reader)?,
                    Err(e) => return Err(invalid(format!("PCAPNG parse error: {}", e))),
                }
            },
        }
        Ok(count)
    }
}

fn refill_legacy<S: Read>(reader: &mut LegacyPcapReader<S>) -> Result<(), CaptureError> {
    reader
        .refill()
        .map_err(|e| invalid(format!("legacy PCAP refill error: {}", e)))
}

fn refill_ng<S: Read>(reader: &mut PcapNGReader<S>) -> Result<(), CaptureError> {
    reader
        .refill()
        .map_err(|e| invalid(format!("PCAPNG refill error: {}", e)))
}

fn invalid(reason: impl Into<String>) -> CaptureError {
    CaptureError::InvalidFormat {
        reason: reason.into(),
    }
}

/// Decode an `if_tsresol` option value: the high bit selects a power of two,
/// otherwise a power of ten.
fn ticks_per_sec(tsresol: u8) -> u64 {
    let exponent = (tsresol & 0x7f) as u32;
    let units = if tsresol & 0x80 == 0 {
        10u64.checked_pow(exponent)
    } else {
        2u64.checked_pow(exponent)
    };
    units.filter(|u| *u > 0).unwrap_or(DEFAULT_TICKS_PER_SEC)
}

fn ticks_to_timestamp(ticks: u64, per_sec: u64) -> Timestamp {
    let secs = i64::try_from(ticks / per_sec)
        .unwrap_or(i64::MAX)
        .min(Timestamp::MAX_SECS);
    let frac = ticks % per_sec;
    let micros = (frac as u128 * 1_000_000 / per_sec as u128) as u32;
    Timestamp::new(secs, micros)
}
