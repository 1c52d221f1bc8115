//! Ethernet II protocol parser.

use etherparse::Ethernet2HeaderSlice;
use smallvec::SmallVec;

use super::{too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::{LayerKind, LinkType};

/// Ethernet II header length in bytes.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// EtherType values the dissector acts on.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
    /// Pre-standard QinQ tag still seen in the wild.
    pub const QINQ_LEGACY: u16 = 0x9100;
}

/// Ethernet II protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct EthernetProtocol;

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Ethernet
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.is_root() && context.link_type == LinkType::ETHERNET {
            Some(100)
        } else {
            None
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        let eth = Ethernet2HeaderSlice::from_slice(data)
            .map_err(|_| too_short("ethernet", ETHERNET_HEADER_LEN, data.len()))?;

        let mut child_hints = SmallVec::new();
        child_hints.push(("ethertype", eth.ether_type().0 as u64));

        Ok(ParseResult::success(
            ETHERNET_HEADER_LEN,
            &data[ETHERNET_HEADER_LEN..],
            child_hints,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ethertype: u16) -> Vec<u8> {
        let mut frame = vec![0xff; 6];
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(&[0xde, 0xad]);
        frame
    }

    // Test 1: ethertype hint and payload split
    #[test]
    fn test_parse_ethernet() {
        let data = frame(ethertype::IPV6);
        let ctx = ParseContext::new(LinkType::ETHERNET);
        let result = EthernetProtocol.parse(&data, &ctx).unwrap();

        assert_eq!(result.header_len, 14);
        assert_eq!(result.hint("ethertype"), Some(ethertype::IPV6 as u64));
        assert_eq!(result.remaining, &[0xde, 0xad]);
        assert!(!result.opaque_payload);
    }

    // Test 2: only claimed at the root of an Ethernet capture
    #[test]
    fn test_can_parse_only_at_root() {
        let root_ctx = ParseContext::new(LinkType::ETHERNET);
        assert!(EthernetProtocol.can_parse(&root_ctx).is_some());

        let sll_ctx = ParseContext::new(LinkType::LINUX_SLL);
        assert!(EthernetProtocol.can_parse(&sll_ctx).is_none());

        let mut inner = ParseContext::new(LinkType::ETHERNET);
        inner.parent = Some(LayerKind::Ipv4);
        assert!(EthernetProtocol.can_parse(&inner).is_none());
    }

    // Test 3: truncated header
    #[test]
    fn test_too_short() {
        let ctx = ParseContext::new(LinkType::ETHERNET);
        let err = EthernetProtocol.parse(&[0u8; 10], &ctx).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PacketTooShort {
                protocol: "ethernet",
                needed: 14,
                have: 10
            }
        );
    }
}
