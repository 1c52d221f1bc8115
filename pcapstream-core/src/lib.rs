//! # pcapstream-core
//!
//! Packet capture dispatch with TCP stream reassembly and UDP flow grouping.
//!
//! This crate reads packets from capture files or live interfaces, dissects
//! each one into a stack of protocol layers, and routes it to a reassembly
//! engine or straight to a consumer implementing [`Listener`].
//!
//! ## Features
//!
//! - **Capture Sources**: PCAP (µs and ns) and PCAPNG files, gzip-compressed
//!   transparently, zstd with `compress-zstd`, live interfaces with `libpcap`
//! - **Dissection**: Ethernet, Linux SLL, loopback, VLAN, ARP, IPv4, IPv6,
//!   TCP, UDP, ICMP, ICMPv6
//! - **Packet Pool**: packets are recycled, so steady-state processing does
//!   not allocate
//! - **TCP Stream Reassembly**: ordered, duplicate-free byte streams per
//!   connection direction, with idle eviction
//! - **Datagram Grouping**: UDP datagrams grouped per flow
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pcapstream_core::prelude::*;
//!
//! struct Printer;
//!
//! impl Listener for Printer {
//!     fn accept(&mut self, packet: &Packet<'_>) {
//!         println!("frame {}: {} layers", packet.frame_number(), packet.layers().len());
//!     }
//!
//!     fn accept_error(&mut self, packet: &Packet<'_>, error: &ParseError) {
//!         println!("frame {}: {}", packet.frame_number(), error);
//!     }
//!
//!     fn accept_stream(&mut self, data: &StreamData<'_>) {
//!         println!("{} {}: {} bytes", data.connection.key, data.direction, data.data.len());
//!     }
//! }
//!
//! let mut dispatcher = Dispatcher::new(DispatchConfig::default(), shared(Printer));
//! dispatcher.read_file("capture.pcap", None).unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pcapstream-core                              |
//! +---------------------------------------------------------------------+
//! |  io/         - CaptureSource, PCAP/PCAPNG reader, filters, live     |
//! |  pcap/       - PcapSource (files, compression)                      |
//! |  packet/     - Packet, Layer, PacketPool, Timestamp                 |
//! |  protocol/   - Protocol trait, registry, header parsers             |
//! |  dispatch/   - Dispatcher, routing, configuration                   |
//! |  stream/     - TCP connection tracking and reassembly               |
//! |  datagram/   - UDP flow grouping                                    |
//! |  listener    - Listener trait and delivery types                    |
//! |  error/      - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Crate Features
//!
//! - `libpcap` - Live capture and BPF filters through the system libpcap
//! - `compress-zstd` - Zstd decompression support

pub mod datagram;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod listener;
pub mod packet;
pub mod pcap;
pub mod prelude;
pub mod protocol;
pub mod stream;

// Re-export commonly used types at crate root for convenience
pub use datagram::{DatagramConfig, DatagramReassembler, FlowKey};
pub use dispatch::{DispatchConfig, DispatchStats, Dispatcher, SourceSpec, UnknownLayerPolicy};
pub use error::{CaptureError, Error, ParseError, ProtocolError, Result};
pub use io::{CaptureSource, RawFrame};
pub use listener::{
    shared, CaptureInfo, CloseReason, DatagramGroup, GroupReason, Listener, NullListener,
    SharedListener, StreamData, StreamSummary,
};
pub use packet::{Layer, LayerKind, LinkType, Packet, PacketPool, Timestamp};
pub use pcap::PcapSource;
pub use protocol::{default_registry, dissect, Protocol, ProtocolRegistry};
pub use stream::{
    Connection, ConnectionKey, ConnectionState, Direction, FlushScope, StreamConfig,
    StreamReassembler,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
