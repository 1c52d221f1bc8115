//! End-to-end replay of capture files through the dispatcher.
//!
//! Captures are written to temporary files in legacy pcap, gzip-compressed
//! pcap and pcapng form, then read back with `Dispatcher::read_file`.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use etherparse::PacketBuilder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use pcapstream_core::prelude::*;
use pcapstream_core::{CaptureError, SharedListener};

/// Collects what the dispatcher hands out.
#[derive(Default)]
struct Collector {
    captures: Vec<CaptureInfo>,
    accepted: Vec<u64>,
    errors: Vec<u64>,
    to_server: Vec<u8>,
    to_client: Vec<u8>,
    chunks: usize,
    closed: Vec<CloseReason>,
    groups: Vec<(String, usize, GroupReason)>,
}

impl Listener for Collector {
    fn begin_capture(&mut self, info: &CaptureInfo) {
        self.captures.push(info.clone());
    }

    fn accept(&mut self, packet: &Packet<'_>) {
        self.accepted.push(packet.frame_number());
    }

    fn accept_error(&mut self, packet: &Packet<'_>, _error: &ParseError) {
        self.errors.push(packet.frame_number());
    }

    fn accept_stream(&mut self, data: &StreamData<'_>) {
        self.chunks += 1;
        match data.direction {
            Direction::ToServer => self.to_server.extend_from_slice(data.data),
            Direction::ToClient => self.to_client.extend_from_slice(data.data),
        }
    }

    fn stream_closed(&mut self, summary: &StreamSummary<'_>) {
        self.closed.push(summary.reason);
    }

    fn accept_datagrams(&mut self, group: &DatagramGroup<'_>) {
        self.groups
            .push((group.flow.to_string(), group.packets.len(), group.reason));
    }
}

fn dispatcher() -> (Dispatcher, Rc<RefCell<Collector>>) {
    let collector = Rc::new(RefCell::new(Collector::default()));
    let listener: SharedListener = collector.clone();
    (Dispatcher::new(DispatchConfig::default(), listener), collector)
}

const CLIENT: [u8; 4] = [192, 168, 1, 10];
const SERVER: [u8; 4] = [192, 168, 1, 20];

fn tcp(from_client: bool, seq: u32, syn: bool, fin: bool, payload: &[u8]) -> Vec<u8> {
    let (src, dst, sport, dport) = if from_client {
        (CLIENT, SERVER, 51000, 8080)
    } else {
        (SERVER, CLIENT, 8080, 51000)
    };
    let mut builder = PacketBuilder::ethernet2([0x02; 6], [0x04; 6])
        .ipv4(src, dst, 64)
        .tcp(sport, dport, seq, 8192);
    if syn {
        builder = builder.syn();
    } else {
        builder = builder.ack(1);
    }
    if fin {
        builder = builder.fin();
    }
    let mut frame = Vec::new();
    builder.write(&mut frame, payload).unwrap();
    frame
}

fn dns_query(id: u8) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0x02; 6], [0x04; 6])
        .ipv4(CLIENT, [8, 8, 8, 8], 64)
        .udp(53000, 53);
    let mut frame = Vec::new();
    builder.write(&mut frame, &[id, 0x01, 0x01, 0x00]).unwrap();
    frame
}

/// A short HTTP exchange whose request arrives out of order and ends with
/// the usual last ACK, plus two DNS queries and one LLDP frame nobody
/// decodes.
fn conversation() -> Vec<Vec<u8>> {
    let mut lldp = vec![0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02];
    lldp.extend_from_slice(&[0x88, 0xcc, 0x02, 0x07, 0x04]);
    vec![
        tcp(true, 999, true, false, b""),
        tcp(false, 4999, true, false, b""),
        tcp(true, 1016, false, false, b"Host: x\r\n\r\n"),
        tcp(true, 1000, false, false, b"GET / HTTP/1.1\r\n"),
        dns_query(1),
        tcp(false, 5000, false, false, b"HTTP/1.1 204 No Content\r\n\r\n"),
        lldp,
        dns_query(2),
        tcp(true, 1027, false, true, b""),
        tcp(false, 5027, false, true, b""),
        tcp(true, 1028, false, false, b""),
    ]
}

fn pcap_bytes(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // Ethernet
    for (i, frame) in frames.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000 + i as u32).to_le_bytes());
        out.extend_from_slice(&250_000u32.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    out
}

fn pcapng_bytes(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    // Section header block
    out.extend_from_slice(&0x0a0d0d0au32.to_le_bytes());
    out.extend_from_slice(&28u32.to_le_bytes());
    out.extend_from_slice(&0x1a2b3c4du32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(-1i64).to_le_bytes());
    out.extend_from_slice(&28u32.to_le_bytes());
    // Interface description block
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&20u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // Ethernet
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // no snaplen limit
    out.extend_from_slice(&20u32.to_le_bytes());
    // Enhanced packet blocks
    for (i, frame) in frames.iter().enumerate() {
        let padded = (frame.len() + 3) & !3;
        let total = 32 + padded as u32;
        let micros = (1_700_000_000u64 + i as u64) * 1_000_000;
        out.extend_from_slice(&6u32.to_le_bytes());
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&((micros >> 32) as u32).to_le_bytes());
        out.extend_from_slice(&(micros as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
        out.resize(out.len() + padded - frame.len(), 0);
        out.extend_from_slice(&total.to_le_bytes());
    }
    out
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn assert_conversation(path: &Path) {
    let (mut d, collector) = dispatcher();
    let frames = d.read_file(path, None).unwrap();
    assert_eq!(frames, 11);
    assert!(!d.is_open());

    let c = collector.borrow();
    assert_eq!(c.captures.len(), 1);
    assert_eq!(c.captures[0].link_type, LinkType::ETHERNET);
    assert_eq!(c.to_server, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert_eq!(c.to_client, b"HTTP/1.1 204 No Content\r\n\r\n");
    assert_eq!(c.chunks, 2);
    assert_eq!(c.closed, vec![CloseReason::Finished]);
    assert_eq!(
        c.groups,
        vec![(
            "udp 8.8.8.8:53 <-> 192.168.1.10:53000".to_string(),
            2,
            GroupReason::Flushed
        )]
    );
    // LLDP is dropped silently; everything else was claimed by an engine.
    assert!(c.accepted.is_empty());
    assert!(c.errors.is_empty());

    let stats = d.stats();
    assert_eq!(stats.unknown_discarded, 1);
    assert_eq!(stats.streamed, 8);
    assert_eq!(stats.datagrams, 2);
    assert_eq!(d.pool().in_use(), 0);

    let streams = d.stream_stats().unwrap();
    assert_eq!(streams.connections_opened, 1);
    assert_eq!(streams.late_segments, 1);
}

// Test 1: legacy pcap
#[test]
fn test_replay_pcap() {
    let file = write_temp(&pcap_bytes(&conversation()));
    assert_conversation(file.path());
}

// Test 2: gzip-compressed pcap
#[test]
fn test_replay_gzip_pcap() {
    let file = write_temp(&gzip(&pcap_bytes(&conversation())));
    assert_conversation(file.path());
}

// Test 3: pcapng
#[test]
fn test_replay_pcapng() {
    let file = write_temp(&pcapng_bytes(&conversation()));
    assert_conversation(file.path());
}

// Test 4: a missing file fails the open and leaves nothing behind
#[test]
fn test_missing_file() {
    let (mut d, collector) = dispatcher();
    let err = d.read_file("/nonexistent/capture.pcap", None).unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::FileNotFound { .. })
    ));
    assert!(!d.is_open());
    assert!(collector.borrow().captures.is_empty());
}

// Test 5: garbage is an invalid format
#[test]
fn test_invalid_file() {
    let file = write_temp(b"this is not a capture file at all");
    let (mut d, _collector) = dispatcher();
    let err = d
        .open(&SourceSpec::file(file.path()), None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::InvalidFormat { .. })
    ));
}

// Test 6: a second open is refused and the first source keeps working
#[test]
fn test_busy_open() {
    let first = write_temp(&pcap_bytes(&conversation()));
    let second = write_temp(&pcap_bytes(&[dns_query(9)]));
    let (mut d, collector) = dispatcher();

    d.open(&SourceSpec::file(first.path()), None).unwrap();
    let err = d.open(&SourceSpec::file(second.path()), None).unwrap_err();
    assert!(matches!(err, Error::AlreadyOpen { .. }));

    assert_eq!(d.read_all().unwrap(), 11);
    d.close().unwrap();
    d.flush();
    assert_eq!(collector.borrow().to_server.len(), 27);
    assert!(matches!(d.close(), Err(Error::NotOpen)));
}

// Test 7: without libpcap a filter cannot be compiled
#[cfg(not(feature = "libpcap"))]
#[test]
fn test_filter_unsupported() {
    let file = write_temp(&pcap_bytes(&conversation()));
    let (mut d, _collector) = dispatcher();
    let err = d.read_file(file.path(), Some("tcp")).unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::FilterUnsupported { .. })
    ));
    assert!(!d.is_open());

    // An empty expression is no filter at all.
    assert_eq!(d.read_file(file.path(), Some("")).unwrap(), 11);
}

// Test 8: a BPF filter drops frames before dissection
#[cfg(feature = "libpcap")]
#[test]
fn test_filter_udp_only() {
    let file = write_temp(&pcap_bytes(&conversation()));
    let (mut d, collector) = dispatcher();
    assert_eq!(d.read_file(file.path(), Some("udp")).unwrap(), 2);
    let c = collector.borrow();
    assert!(c.closed.is_empty());
    assert_eq!(c.groups.len(), 1);
}
