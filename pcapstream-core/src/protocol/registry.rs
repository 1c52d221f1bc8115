//! Protocol registry for managing parsers.

use crate::error::ProtocolError;
use crate::packet::LayerKind;

use super::{
    ArpProtocol, EthernetProtocol, IcmpProtocol, Icmpv6Protocol, Ipv4Protocol, Ipv6Protocol,
    LinuxSllProtocol, LoopbackProtocol, ParseContext, ParseResult, TcpProtocol, UdpProtocol,
    VlanProtocol,
};

/// Core trait all protocol parsers must implement.
pub trait Protocol: Send + Sync {
    /// Unique identifier for this protocol (e.g., "tcp").
    fn name(&self) -> &'static str;

    /// Layer kind recorded on the packet for this header.
    fn kind(&self) -> LayerKind;

    /// Check if this parser can handle the given context.
    /// Returns a priority score (higher = more specific match).
    /// Returns `None` if this parser cannot handle the context.
    fn can_parse(&self, context: &ParseContext) -> Option<u32>;

    /// Parse one header. Truncated or inconsistent headers are errors.
    fn parse<'a>(
        &self,
        data: &'a [u8],
        context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError>;
}

/// Enum of all built-in protocol parsers.
///
/// This enables static dispatch (no vtable overhead) for all built-in protocols.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    LinuxSll(LinuxSllProtocol),
    Loopback(LoopbackProtocol),
    Vlan(VlanProtocol),
    Arp(ArpProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Icmp(IcmpProtocol),
    Icmpv6(Icmpv6Protocol),
}

/// Macro to delegate Protocol trait methods to inner types.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::LinuxSll(p) => p.$method($($arg),*),
            BuiltinProtocol::Loopback(p) => p.$method($($arg),*),
            BuiltinProtocol::Vlan(p) => p.$method($($arg),*),
            BuiltinProtocol::Arp(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv6(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmpv6(p) => p.$method($($arg),*),
        }
    };
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn kind(&self) -> LayerKind {
        delegate_protocol!(self, kind)
    }

    #[inline]
    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        delegate_protocol!(self, can_parse, context)
    }

    #[inline]
    fn parse<'a>(
        &self,
        data: &'a [u8],
        context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        delegate_protocol!(self, parse, data, context)
    }
}

/// Parsers in layer order, selected by priority for each parse context.
///
/// Equal priorities go to the parser registered first, so registration
/// order is the tie-break.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    parsers: Vec<BuiltinProtocol>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every parser this crate ships, link layer first.
    pub fn builtin() -> Self {
        use BuiltinProtocol::*;
        [
            Ethernet(EthernetProtocol),
            LinuxSll(LinuxSllProtocol),
            Loopback(LoopbackProtocol),
            Vlan(VlanProtocol),
            Arp(ArpProtocol),
            Ipv4(Ipv4Protocol),
            Ipv6(Ipv6Protocol),
            Tcp(TcpProtocol),
            Udp(UdpProtocol),
            Icmp(IcmpProtocol),
            Icmpv6(Icmpv6Protocol),
        ]
        .into_iter()
        .collect()
    }

    pub fn register(&mut self, parser: BuiltinProtocol) {
        self.parsers.push(parser);
    }

    /// The parser that claims `context` with the highest priority.
    pub fn select(&self, context: &ParseContext) -> Option<&BuiltinProtocol> {
        let mut best: Option<(&BuiltinProtocol, u32)> = None;
        for parser in &self.parsers {
            if let Some(priority) = parser.can_parse(context) {
                if best.map_or(true, |(_, current)| priority > current) {
                    best = Some((parser, priority));
                }
            }
        }
        best.map(|(parser, _)| parser)
    }

    /// Whether a parser producing `kind` layers is registered.
    pub fn handles(&self, kind: LayerKind) -> bool {
        self.parsers.iter().any(|p| p.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl FromIterator<BuiltinProtocol> for ProtocolRegistry {
    fn from_iter<I: IntoIterator<Item = BuiltinProtocol>>(iter: I) -> Self {
        Self {
            parsers: iter.into_iter().collect(),
        }
    }
}
