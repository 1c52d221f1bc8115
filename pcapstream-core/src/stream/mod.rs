//! TCP connection tracking and stream reassembly.
//!
//! ## Components
//!
//! - [`ConnectionTracker`] - Keys connections by their endpoint pair and
//!   tracks their lifecycle
//! - [`StreamBuffer`] - Orders one direction's segments into a byte stream
//! - [`StreamReassembler`] - Ties the two together and delivers in-order
//!   chunks to a [`Listener`](crate::Listener)
//!
//! Sequence numbers are relative to the first byte after the SYN when the
//! handshake was captured, or to the first data byte seen otherwise.
//!
//! ## Example
//!
//! ```rust
//! use pcapstream_core::listener::{shared, NullListener};
//! use pcapstream_core::stream::{FlushScope, StreamConfig, StreamReassembler};
//!
//! let mut engine = StreamReassembler::new(StreamConfig::default(), shared(NullListener));
//! // engine.process(&packet) for every TCP packet...
//! engine.flush(FlushScope::All);
//! assert_eq!(engine.connection_count(), 0);
//! ```

mod connection;
mod manager;
mod reassembly;

pub use connection::{
    Connection, ConnectionKey, ConnectionState, ConnectionTracker, Direction, Endpoint, TcpFlags,
};
pub use manager::{FlushScope, ReassemblyStats, StreamConfig, StreamKey, StreamReassembler};
pub use reassembly::{Delivery, StreamBuffer, StreamStats};
