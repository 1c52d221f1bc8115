//! The capture dispatcher.
//!
//! [`Dispatcher`] owns one capture source, one packet pool and the optional
//! reassemblers. Every frame the source delivers goes through
//! [`Dispatcher::handle_packet`]:
//!
//! 1. Claim a packet from the pool and dissect the frame into it.
//! 2. Advance both reassemblers' logical time to the packet's timestamp.
//! 3. Route on the two innermost layers: TCP to the stream reassembler,
//!    UDP to the datagram reassembler, anything else to the listener.
//! 4. Unknown layers are discarded or reported per [`UnknownLayerPolicy`];
//!    malformed packets always go to `accept_error`.
//!
//! Everything runs on the calling thread, one packet at a time.

mod config;
mod dispatcher;

pub use config::{DispatchConfig, UnknownLayerPolicy};
pub use dispatcher::{classify, DispatchStats, Dispatcher, Route, SourceSpec};
