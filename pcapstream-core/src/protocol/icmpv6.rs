//! ICMPv6 protocol parser.

use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

/// Type, code and checksum; the message body is treated as payload.
const ICMPV6_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Icmpv6Protocol;

impl Protocol for Icmpv6Protocol {
    fn name(&self) -> &'static str {
        "icmpv6"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Icmpv6
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match (context.hint("ip_protocol"), context.hint("ip_version")) {
            (Some(proto), Some(6)) if proto == ip_proto::ICMPV6 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < ICMPV6_HEADER_LEN {
            return Err(too_short("icmpv6", ICMPV6_HEADER_LEN, data.len()));
        }
        Ok(ParseResult::terminal(ICMPV6_HEADER_LEN, &data[ICMPV6_HEADER_LEN..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkType;

    // Test 1: only claimed under IPv6
    #[test]
    fn test_requires_ipv6() {
        let mut ctx = ParseContext::new(LinkType::ETHERNET);
        ctx.set_hint("ip_protocol", 58);
        assert!(Icmpv6Protocol.can_parse(&ctx).is_none());
        ctx.set_hint("ip_version", 6);
        assert!(Icmpv6Protocol.can_parse(&ctx).is_some());

        let data = [135u8, 0, 0, 0, 0, 0, 0, 0];
        let result = Icmpv6Protocol.parse(&data, &ctx).unwrap();
        assert_eq!(result.header_len, 4);
        assert_eq!(result.remaining.len(), 4);
    }
}
