//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust
//! use pcapstream_core::prelude::*;
//!
//! let dispatcher = Dispatcher::new(DispatchConfig::default(), shared(NullListener));
//! assert!(!dispatcher.is_open());
//! ```

// Dispatch
pub use crate::dispatch::{DispatchConfig, Dispatcher, SourceSpec, UnknownLayerPolicy};

// Listener side
pub use crate::listener::{
    shared, CaptureInfo, CloseReason, DatagramGroup, GroupReason, Listener, NullListener,
    SharedListener, StreamData, StreamSummary,
};

// Packets
pub use crate::packet::{Layer, LayerKind, LinkType, Packet, Timestamp};

// Reassembly
pub use crate::datagram::{DatagramConfig, FlowKey};
pub use crate::stream::{Direction, StreamConfig};

// Error types
pub use crate::error::{Error, ParseError, Result};
