//! Protocol dissection.
//!
//! This module provides:
//! - [`Protocol`] trait for implementing header parsers
//! - [`ProtocolRegistry`] for priority-based parser selection
//! - [`dissect`], which walks a frame into its layer stack
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet, Linux SLL, BSD loopback, raw IP, VLAN (802.1Q/802.1ad) |
//! | Network | IPv4, IPv6 (with extension headers), ARP |
//! | Transport | TCP, UDP, ICMP, ICMPv6 |
//!
//! Anything after a transport header is recorded as an opaque
//! [`LayerKind::Data`] layer.
//!
//! ## Example
//!
//! ```rust
//! use pcapstream_core::packet::{LayerKind, LinkType};
//! use pcapstream_core::protocol::{default_registry, dissect};
//! use smallvec::SmallVec;
//!
//! let registry = default_registry();
//! let frame: &[u8] = &[
//!     0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // dst mac
//!     0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src mac
//!     0x88, 0xcc,                         // LLDP, which we do not decode
//!     0x02, 0x07,
//! ];
//!
//! let mut layers = SmallVec::new();
//! let err = dissect(&registry, LinkType::ETHERNET, frame, &mut layers).unwrap_err();
//! assert!(err.is_unrecognized());
//! assert_eq!(layers[0].kind, LayerKind::Ethernet);
//! ```

mod context;
mod registry;

mod arp;
mod ethernet;
mod icmp;
mod icmpv6;
mod ipv4;
mod ipv6;
mod linux_sll;
mod loopback;
mod tcp;
mod udp;
mod vlan;

#[cfg(test)]
pub mod test_utils;

pub use context::{HintEntry, ParseContext, ParseResult};
pub use registry::{BuiltinProtocol, Protocol, ProtocolRegistry};

pub use arp::ArpProtocol;
pub use ethernet::{ethertype, EthernetProtocol};
pub use icmp::IcmpProtocol;
pub use icmpv6::Icmpv6Protocol;
pub use ipv4::Ipv4Protocol;
pub use ipv6::{next_header, Ipv6Protocol};
pub use linux_sll::LinuxSllProtocol;
pub use loopback::LoopbackProtocol;
pub use tcp::{flags as tcp_flags, TcpProtocol};
pub use udp::UdpProtocol;
pub use vlan::VlanProtocol;

use smallvec::SmallVec;

use crate::error::{ParseError, ProtocolError};
use crate::packet::{Layer, LayerKind, LinkType};

/// IP protocol numbers.
pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6_IN_IP: u8 = 41;
    pub const ICMPV6: u8 = 58;
}

pub(crate) fn too_short(protocol: &'static str, needed: usize, have: usize) -> ProtocolError {
    ProtocolError::PacketTooShort {
        protocol,
        needed,
        have,
    }
}

/// Registry holding every built-in parser.
pub fn default_registry() -> ProtocolRegistry {
    ProtocolRegistry::builtin()
}

/// Parse `data` into `layers`, outermost first.
///
/// Stops cleanly at the end of the data or after an opaque payload.
/// Returns [`ParseError::UnrecognizedLayer`] when no parser claims the
/// next header and [`ParseError::MalformedData`] when a claimed header
/// does not parse. Layers pushed before an error are left in place.
pub fn dissect(
    registry: &ProtocolRegistry,
    link_type: LinkType,
    data: &[u8],
    layers: &mut SmallVec<[Layer; 8]>,
) -> Result<(), ParseError> {
    let mut context = ParseContext::new(link_type);
    if link_type.is_raw_ip() {
        // Raw IP captures: the version nibble picks the network parser.
        match data.first().map(|b| b >> 4) {
            Some(4) => context.set_hint("ethertype", ethertype::IPV4 as u64),
            Some(6) => context.set_hint("ethertype", ethertype::IPV6 as u64),
            _ => {}
        }
    }

    let mut remaining = data;
    let mut offset = 0;

    while !remaining.is_empty() {
        let parser = registry
            .select(&context)
            .ok_or_else(|| unrecognized(&context))?;

        let result = parser
            .parse(remaining, &context)
            .map_err(|source| ParseError::MalformedData {
                layer: parser.kind(),
                source,
            })?;

        layers.push(Layer::new(parser.kind(), offset, result.header_len));
        offset += result.header_len;
        remaining = result.remaining;

        if result.opaque_payload {
            if !remaining.is_empty() {
                layers.push(Layer::new(LayerKind::Data, offset, remaining.len()));
            }
            break;
        }

        context.parent = Some(parser.kind());
        context.hints = result.child_hints;
        context.offset = offset;
    }

    Ok(())
}

fn unrecognized(context: &ParseContext) -> ParseError {
    let detail = if let Some(et) = context.hint("ethertype") {
        format!("ethertype {:#06x}", et)
    } else if let Some(proto) = context.hint("ip_protocol") {
        format!("ip protocol {}", proto)
    } else if context.is_root() {
        format!("link type {}", context.link_type)
    } else {
        "no protocol hint".to_string()
    };
    ParseError::UnrecognizedLayer {
        after: context.parent,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{tcp_packet, TcpSegmentBuilder};
    use etherparse::PacketBuilder;

    fn kinds(layers: &[Layer]) -> Vec<LayerKind> {
        layers.iter().map(|l| l.kind).collect()
    }

    // Test 1: Ethernet/IPv4/TCP with payload
    #[test]
    fn test_dissect_tcp_with_payload() {
        let data = tcp_packet(40000, 80, 1, b"GET / HTTP/1.1\r\n");
        let mut layers = SmallVec::new();
        dissect(&default_registry(), LinkType::ETHERNET, &data, &mut layers).unwrap();

        assert_eq!(
            kinds(&layers),
            vec![LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Tcp, LayerKind::Data]
        );
        let payload = layers[3];
        assert_eq!(&data[payload.offset..payload.end()], b"GET / HTTP/1.1\r\n");
    }

    // Test 2: pure ACK has no Data layer
    #[test]
    fn test_dissect_pure_ack() {
        let data = TcpSegmentBuilder::new().ack(5).build();
        let mut layers = SmallVec::new();
        dissect(&default_registry(), LinkType::ETHERNET, &data, &mut layers).unwrap();
        assert_eq!(layers.last().unwrap().kind, LayerKind::Tcp);
        assert_eq!(layers.len(), 3);
    }

    // Test 3: unknown ethertype is the soft error
    #[test]
    fn test_unknown_ethertype() {
        let mut data = vec![0xff; 12];
        data.extend_from_slice(&[0x88, 0xcc, 0x02, 0x07]);
        let mut layers = SmallVec::new();
        let err = dissect(&default_registry(), LinkType::ETHERNET, &data, &mut layers).unwrap_err();

        assert_eq!(
            err,
            ParseError::UnrecognizedLayer {
                after: Some(LayerKind::Ethernet),
                detail: "ethertype 0x88cc".to_string(),
            }
        );
        assert_eq!(layers.len(), 1);
    }

    // Test 4: unknown link type
    #[test]
    fn test_unknown_link_type() {
        let mut layers = SmallVec::new();
        let err = dissect(&default_registry(), LinkType(147), &[1, 2, 3], &mut layers).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedLayer { after: None, .. }));
        assert!(layers.is_empty());
    }

    // Test 5: truncated IPv4 header is malformed, not unrecognized
    #[test]
    fn test_truncated_ipv4() {
        let mut data = tcp_packet(40000, 80, 1, b"x");
        data.truncate(14 + 10);
        let mut layers = SmallVec::new();
        let err = dissect(&default_registry(), LinkType::ETHERNET, &data, &mut layers).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MalformedData {
                layer: LayerKind::Ipv4,
                ..
            }
        ));
    }

    // Test 6: raw IPv6 UDP
    #[test]
    fn test_raw_ipv6_udp() {
        let builder = PacketBuilder::ipv6([0x20; 16], [0x21; 16], 64).udp(5000, 53);
        let mut data = Vec::with_capacity(builder.size(3));
        builder.write(&mut data, b"abc").unwrap();

        let mut layers = SmallVec::new();
        dissect(&default_registry(), LinkType::RAW, &data, &mut layers).unwrap();
        assert_eq!(
            kinds(&layers),
            vec![LayerKind::Ipv6, LayerKind::Udp, LayerKind::Data]
        );
    }

    // Test 7: VLAN-tagged frame with Ethernet padding
    #[test]
    fn test_vlan_with_padding() {
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .single_vlan(etherparse::VlanId::try_new(100).unwrap())
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(1000, 2000);
        let mut data = Vec::new();
        builder.write(&mut data, b"hi").unwrap();
        data.extend_from_slice(&[0; 16]);

        let mut layers = SmallVec::new();
        dissect(&default_registry(), LinkType::ETHERNET, &data, &mut layers).unwrap();
        assert_eq!(
            kinds(&layers),
            vec![
                LayerKind::Ethernet,
                LayerKind::Vlan,
                LayerKind::Ipv4,
                LayerKind::Udp,
                LayerKind::Data
            ]
        );
        assert_eq!(layers[4].len, 2);
    }
}
