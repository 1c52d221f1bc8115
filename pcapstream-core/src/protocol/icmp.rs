//! ICMP protocol parser.

use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

/// Type, code, checksum and the 4-byte rest-of-header.
const ICMP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct IcmpProtocol;

impl Protocol for IcmpProtocol {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Icmp
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == ip_proto::ICMP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(too_short("icmp", ICMP_HEADER_LEN, data.len()));
        }
        Ok(ParseResult::terminal(ICMP_HEADER_LEN, &data[ICMP_HEADER_LEN..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkType;

    // Test 1: echo request body is opaque
    #[test]
    fn test_echo_request() {
        let data = [8u8, 0, 0xf7, 0xff, 0, 1, 0, 1, b'p', b'i', b'n', b'g'];
        let mut ctx = ParseContext::new(LinkType::ETHERNET);
        ctx.set_hint("ip_protocol", 1);

        let result = IcmpProtocol.parse(&data, &ctx).unwrap();
        assert_eq!(result.header_len, 8);
        assert_eq!(result.remaining, b"ping");
    }
}
