use std::fmt;

use etherparse::UdpHeaderSlice;

use crate::packet::{LayerKind, Packet};
use crate::protocol::ip_proto;
use crate::stream::Endpoint;

/// Canonical identifier of a datagram flow.
///
/// Both directions of an exchange map to the same key: the endpoints are
/// stored in sorted order.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct FlowKey {
    pub a: Endpoint,
    pub b: Endpoint,
    /// IP protocol number
    pub protocol: u8,
}

impl FlowKey {
    pub fn new(src: Endpoint, dst: Endpoint, protocol: u8) -> Self {
        let (a, b) = if src <= dst { (src, dst) } else { (dst, src) };
        Self { a, b, protocol }
    }

    /// Key of a UDP packet, if it has both an IP and a UDP header.
    pub fn from_packet(packet: &Packet<'_>) -> Option<Self> {
        let layer = packet.find_layer(LayerKind::Udp)?;
        let udp = UdpHeaderSlice::from_slice(packet.layer_data(layer)).ok()?;
        let (src, dst) = packet.ip_addrs()?;
        Some(Self::new(
            Endpoint::new(src, udp.source_port()),
            Endpoint::new(dst, udp.destination_port()),
            ip_proto::UDP,
        ))
    }

    pub fn protocol_name(&self) -> &'static str {
        match self.protocol {
            ip_proto::UDP => "udp",
            ip_proto::TCP => "tcp",
            _ => "ip",
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <-> {}", self.protocol_name(), self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkType;
    use crate::protocol::default_registry;
    use crate::protocol::test_utils::{frame, tcp_packet, udp_packet_between, CLIENT_IP, SERVER_IP};

    fn key_of(bytes: &[u8]) -> Option<FlowKey> {
        let raw = frame(bytes, 1);
        let mut packet = Packet::new();
        packet.init(LinkType::ETHERNET, &raw, &default_registry()).unwrap();
        FlowKey::from_packet(&packet)
    }

    // Test 1: both directions share a key
    #[test]
    fn test_key_is_direction_independent() {
        let query = udp_packet_between(CLIENT_IP, SERVER_IP, 5353, 53, b"q");
        let answer = udp_packet_between(SERVER_IP, CLIENT_IP, 53, 5353, b"a");
        let key = key_of(&query).unwrap();
        assert_eq!(Some(key.clone()), key_of(&answer));
        assert_eq!(key.to_string(), "udp 10.0.0.1:5353 <-> 10.0.0.2:53");
    }

    // Test 2: TCP packets have no datagram key
    #[test]
    fn test_tcp_has_no_key() {
        assert!(key_of(&tcp_packet(1, 2, 3, b"x")).is_none());
    }
}
