use std::fmt;

/// Protocol layers the dissector can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Ethernet,
    LinuxSll,
    /// BSD loopback / null encapsulation.
    Loopback,
    Vlan,
    Arp,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    /// Opaque payload following a transport header.
    Data,
}

impl LayerKind {
    /// Return a string representation of the layer kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Ethernet => "ethernet",
            LayerKind::LinuxSll => "linux_sll",
            LayerKind::Loopback => "loopback",
            LayerKind::Vlan => "vlan",
            LayerKind::Arp => "arp",
            LayerKind::Ipv4 => "ipv4",
            LayerKind::Ipv6 => "ipv6",
            LayerKind::Tcp => "tcp",
            LayerKind::Udp => "udp",
            LayerKind::Icmp => "icmp",
            LayerKind::Icmpv6 => "icmpv6",
            LayerKind::Data => "data",
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, LayerKind::Ipv4 | LayerKind::Ipv6)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed header inside a packet: its kind plus the byte span it covers.
///
/// For header layers the span covers the header only; a `Data` layer
/// covers the payload that follows the transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
    pub kind: LayerKind,
    pub offset: usize,
    pub len: usize,
}

impl Layer {
    pub fn new(kind: LayerKind, offset: usize, len: usize) -> Self {
        Self { kind, offset, len }
    }

    /// Offset one past the last byte of this layer.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}
