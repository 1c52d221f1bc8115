//! The consumer side of the pipeline.
//!
//! A [`Listener`] receives everything the dispatcher and the reassembly
//! engines produce: packets that pass straight through, packets that failed
//! to dissect, reassembled stream chunks and grouped datagrams.
//!
//! Packets are handed out as borrowed views that are only valid for the
//! duration of the call. A listener that wants to keep one must take an
//! owned copy with [`Packet::to_owned_packet`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::datagram::FlowKey;
use crate::error::ParseError;
use crate::packet::{LinkType, Packet, Timestamp};
use crate::stream::{Connection, Direction};

/// Shared handle to the active listener.
///
/// The pipeline is single-threaded; the dispatcher and both engines hold
/// clones of the same handle.
pub type SharedListener = Rc<RefCell<dyn Listener>>;

/// Wrap a listener into a [`SharedListener`].
pub fn shared<L: Listener + 'static>(listener: L) -> SharedListener {
    Rc::new(RefCell::new(listener))
}

/// Details of a capture that has just been opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInfo {
    pub source_name: String,
    pub link_type: LinkType,
    /// Maximum bytes captured per frame
    pub snaplen: u32,
}

/// A contiguous chunk of one direction of a TCP connection.
#[derive(Debug)]
pub struct StreamData<'a> {
    pub connection: &'a Connection,
    pub direction: Direction,
    /// Position of `data[0]` in this direction's byte stream
    pub offset: u64,
    pub data: &'a [u8],
    /// Capture time of the segment that made this chunk deliverable
    pub timestamp: Timestamp,
}

/// Why a connection's state was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Both sides sent FIN
    Finished,
    /// A RST was seen
    Reset,
    /// No activity for longer than the idle timeout
    IdleEvicted,
    /// Drained by an explicit flush
    Flushed,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Finished => "finished",
            CloseReason::Reset => "reset",
            CloseReason::IdleEvicted => "idle",
            CloseReason::Flushed => "flushed",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final accounting for a closed connection.
#[derive(Debug)]
pub struct StreamSummary<'a> {
    pub connection: &'a Connection,
    pub reason: CloseReason,
    /// Bytes handed to [`Listener::accept_stream`], both directions
    pub bytes_delivered: u64,
    /// Buffered bytes that could never be delivered, both directions
    pub bytes_discarded: u64,
}

/// Why a datagram group was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupReason {
    /// The group reached its size limit
    GroupFull,
    /// The flow went idle
    IdleEvicted,
    /// Drained by an explicit flush
    Flushed,
}

impl GroupReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupReason::GroupFull => "full",
            GroupReason::IdleEvicted => "idle",
            GroupReason::Flushed => "flushed",
        }
    }
}

/// Datagrams of one flow, in arrival order.
#[derive(Debug)]
pub struct DatagramGroup<'a> {
    pub flow: &'a FlowKey,
    pub packets: &'a [Packet<'static>],
    pub reason: GroupReason,
}

/// Receives the output of a dispatcher.
pub trait Listener {
    /// A capture source was opened.
    fn begin_capture(&mut self, _info: &CaptureInfo) {}

    /// A packet that was not claimed by a reassembly engine.
    fn accept(&mut self, packet: &Packet<'_>);

    /// A packet that could not be dissected. Layers parsed before the
    /// failure are still available on the packet.
    fn accept_error(&mut self, packet: &Packet<'_>, error: &ParseError);

    /// In-order stream data.
    fn accept_stream(&mut self, _data: &StreamData<'_>) {}

    /// A connection was closed or evicted.
    fn stream_closed(&mut self, _summary: &StreamSummary<'_>) {}

    /// A group of datagrams from one flow.
    fn accept_datagrams(&mut self, _group: &DatagramGroup<'_>) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl Listener for NullListener {
    fn accept(&mut self, _packet: &Packet<'_>) {}

    fn accept_error(&mut self, _packet: &Packet<'_>, _error: &ParseError) {}
}
