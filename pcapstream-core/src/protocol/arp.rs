//! ARP protocol parser.

use super::ethernet::ethertype;
use super::{too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

/// Fixed part of an ARP header, before the variable-length addresses.
const ARP_FIXED_LEN: usize = 8;

/// ARP protocol parser. ARP carries no payload, so it ends the chain
/// and any trailing Ethernet padding is ignored.
#[derive(Debug, Clone, Copy)]
pub struct ArpProtocol;

impl Protocol for ArpProtocol {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Arp
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::ARP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < ARP_FIXED_LEN {
            return Err(too_short("arp", ARP_FIXED_LEN, data.len()));
        }

        let hardware_size = data[4] as usize;
        let protocol_size = data[5] as usize;
        let header_len = ARP_FIXED_LEN + 2 * (hardware_size + protocol_size);
        if data.len() < header_len {
            return Err(too_short("arp", header_len, data.len()));
        }

        Ok(ParseResult::terminal(header_len, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkType;

    // Test 1: Ethernet/IPv4 request with padding
    #[test]
    fn test_parse_arp_request() {
        let mut data = vec![
            0x00, 0x01, // hardware type
            0x08, 0x00, // protocol type
            0x06, 0x04, // sizes
            0x00, 0x01, // request
        ];
        data.extend_from_slice(&[0x11; 6]);
        data.extend_from_slice(&[192, 168, 1, 1]);
        data.extend_from_slice(&[0x00; 6]);
        data.extend_from_slice(&[192, 168, 1, 2]);
        data.extend_from_slice(&[0x00; 18]);

        let ctx = ParseContext::new(LinkType::ETHERNET);
        let result = ArpProtocol.parse(&data, &ctx).unwrap();
        assert_eq!(result.header_len, 28);
        assert!(result.remaining.is_empty());
        assert!(result.opaque_payload);
    }

    // Test 2: address lengths larger than the data
    #[test]
    fn test_truncated_addresses() {
        let data = [0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x11, 0x11];
        let ctx = ParseContext::new(LinkType::ETHERNET);
        assert!(matches!(
            ArpProtocol.parse(&data, &ctx),
            Err(ProtocolError::PacketTooShort { needed: 28, .. })
        ));
    }
}
