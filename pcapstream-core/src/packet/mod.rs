//! Captured packets and their layer stacks.
//!
//! A [`Packet`] borrows the capture buffer for the duration of one capture
//! callback (`Packet<'a>`). Anything that keeps a packet past that point
//! must promote it with [`Packet::into_owned`] or [`Packet::to_owned_packet`],
//! which yields a `Packet<'static>` that owns its bytes.
//!
//! Packets are recycled through a [`PacketPool`] so the hot path does not
//! allocate once the pool has warmed up.

mod layer;
mod pool;
mod time;

pub use layer::{Layer, LayerKind};
pub use pool::{PacketPool, PoolStats};
pub use time::{LinkType, Timestamp};

use std::net::IpAddr;

use etherparse::{Ipv4HeaderSlice, Ipv6HeaderSlice};
use smallvec::SmallVec;

use crate::error::ParseError;
use crate::io::RawFrame;
use crate::protocol::{dissect, ProtocolRegistry};

/// One captured frame plus its parsed layer stack (outermost first).
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    frame_number: u64,
    timestamp: Timestamp,
    link_type: LinkType,
    captured_len: u32,
    original_len: u32,
    layers: SmallVec<[Layer; 8]>,
    /// Capture-owned bytes, only valid for the current callback.
    borrowed: Option<&'a [u8]>,
    owned: Vec<u8>,
}

impl Default for Packet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Packet<'a> {
    /// Create an empty packet with no bytes and no layers.
    pub fn new() -> Self {
        Self {
            frame_number: 0,
            timestamp: Timestamp::ZERO,
            link_type: LinkType::ETHERNET,
            captured_len: 0,
            original_len: 0,
            layers: SmallVec::new(),
            borrowed: None,
            owned: Vec::new(),
        }
    }

    /// Point this packet at a raw frame and parse its layer stack.
    ///
    /// The bytes are borrowed, so [`must_copy`](Self::must_copy) is true
    /// afterwards. On error the layers parsed before the failure remain
    /// available.
    pub fn init(
        &mut self,
        link_type: LinkType,
        frame: &RawFrame<'a>,
        registry: &ProtocolRegistry,
    ) -> Result<(), ParseError> {
        self.frame_number = frame.frame_number;
        self.timestamp = frame.timestamp;
        self.link_type = link_type;
        self.captured_len = frame.captured_len;
        self.original_len = frame.original_len;
        self.layers.clear();
        self.owned.clear();
        self.borrowed = Some(frame.data);

        dissect(registry, link_type, frame.data, &mut self.layers)
    }

    /// True while the bytes still alias capture memory.
    pub fn must_copy(&self) -> bool {
        self.borrowed.is_some()
    }

    /// Copy borrowed bytes into the packet's own buffer. No-op if already owned.
    pub fn copy_data(&mut self) {
        if let Some(bytes) = self.borrowed.take() {
            self.owned.clear();
            self.owned.extend_from_slice(bytes);
        }
    }

    /// Promote to a packet that owns its bytes, reusing this packet's buffer.
    pub fn into_owned(mut self) -> Packet<'static> {
        self.copy_data();
        Packet {
            frame_number: self.frame_number,
            timestamp: self.timestamp,
            link_type: self.link_type,
            captured_len: self.captured_len,
            original_len: self.original_len,
            layers: self.layers,
            borrowed: None,
            owned: self.owned,
        }
    }

    /// Owned copy for consumers that want to keep a packet they were lent.
    pub fn to_owned_packet(&self) -> Packet<'static> {
        Packet {
            frame_number: self.frame_number,
            timestamp: self.timestamp,
            link_type: self.link_type,
            captured_len: self.captured_len,
            original_len: self.original_len,
            layers: self.layers.clone(),
            borrowed: None,
            owned: self.data().to_vec(),
        }
    }

    /// Reset to a clean state, keeping buffer capacity.
    pub(crate) fn recycle(self) -> Packet<'static> {
        let Packet {
            mut layers,
            mut owned,
            ..
        } = self;
        layers.clear();
        owned.clear();
        Packet {
            layers,
            owned,
            ..Packet::new()
        }
    }

    /// Captured bytes.
    pub fn data(&self) -> &[u8] {
        match self.borrowed {
            Some(bytes) => bytes,
            None => &self.owned,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer at `index`; negative indices count from the top (-1 is innermost).
    pub fn layer(&self, index: isize) -> Option<&Layer> {
        let position = if index < 0 {
            self.layers.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.layers.get(position)
    }

    /// Innermost layer.
    pub fn top(&self) -> Option<&Layer> {
        self.layer(-1)
    }

    /// Layer directly beneath the top.
    pub fn second(&self) -> Option<&Layer> {
        self.layer(-2)
    }

    /// Innermost layer of the given kind.
    pub fn find_layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().rev().find(|layer| layer.kind == kind)
    }

    /// Bytes covered by `layer`, clamped to what was captured.
    pub fn layer_data(&self, layer: &Layer) -> &[u8] {
        let data = self.data();
        let start = layer.offset.min(data.len());
        let end = layer.end().min(data.len());
        &data[start..end]
    }

    /// Opaque application payload, empty when the top layer is a header.
    pub fn payload(&self) -> &[u8] {
        match self.top() {
            Some(layer) if layer.kind == LayerKind::Data => self.layer_data(layer),
            _ => &[],
        }
    }

    /// Source and destination of the innermost IP header.
    pub fn ip_addrs(&self) -> Option<(IpAddr, IpAddr)> {
        let layer = self
            .layers
            .iter()
            .rev()
            .find(|layer| matches!(layer.kind, LayerKind::Ipv4 | LayerKind::Ipv6))?;
        let data = self.layer_data(layer);
        match layer.kind {
            LayerKind::Ipv4 => {
                let ip = Ipv4HeaderSlice::from_slice(data).ok()?;
                Some((ip.source_addr().into(), ip.destination_addr().into()))
            }
            _ => {
                let ip = Ipv6HeaderSlice::from_slice(data).ok()?;
                Some((ip.source_addr().into(), ip.destination_addr().into()))
            }
        }
    }

    /// Capture timestamp.
    pub fn ts(&self) -> Timestamp {
        self.timestamp
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn captured_len(&self) -> u32 {
        self.captured_len
    }

    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    /// True when the capture cut the frame short (snaplen).
    pub fn is_truncated(&self) -> bool {
        self.captured_len < self.original_len
    }
}
