//! BSD loopback (LINKTYPE_NULL / LINKTYPE_LOOP) header parser.
//!
//! The 4-byte header holds an address family. NULL captures store it in
//! the capturing host's byte order, so both orders are accepted.

use super::{ethertype, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::{LayerKind, LinkType};

pub const LOOPBACK_HEADER_LEN: usize = 4;

/// Address family values seen in loopback headers.
mod family {
    pub const INET: u32 = 2;
    /// AF_INET6 differs between BSDs and macOS.
    pub const INET6: [u32; 3] = [24, 28, 30];
}

fn family_ethertype(family: u32) -> Option<u16> {
    if family == family::INET {
        Some(ethertype::IPV4)
    } else if family::INET6.contains(&family) {
        Some(ethertype::IPV6)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopbackProtocol;

impl Protocol for LoopbackProtocol {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Loopback
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.link_type {
            LinkType::NULL | LinkType::LOOP if context.is_root() => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < LOOPBACK_HEADER_LEN {
            return Err(too_short("loopback", LOOPBACK_HEADER_LEN, data.len()));
        }

        let raw = [data[0], data[1], data[2], data[3]];
        let ethertype =
            family_ethertype(u32::from_be_bytes(raw)).or_else(|| family_ethertype(u32::from_le_bytes(raw)));

        let mut result =
            ParseResult::success(LOOPBACK_HEADER_LEN, &data[LOOPBACK_HEADER_LEN..], Default::default());
        if let Some(ethertype) = ethertype {
            result = result.with_hint("ethertype", ethertype as u64);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: both byte orders decode
    #[test]
    fn test_family_byte_orders() {
        let ctx = ParseContext::new(LinkType::NULL);
        let le = [2u8, 0, 0, 0, 0x45];
        let be = [0u8, 0, 0, 30, 0x60];

        let result = LoopbackProtocol.parse(&le, &ctx).unwrap();
        assert_eq!(result.hint("ethertype"), Some(0x0800));
        assert_eq!(result.remaining, &[0x45]);

        let result = LoopbackProtocol.parse(&be, &ctx).unwrap();
        assert_eq!(result.hint("ethertype"), Some(0x86dd));
    }

    // Test 2: unknown family leaves no hint
    #[test]
    fn test_unknown_family() {
        let ctx = ParseContext::new(LinkType::LOOP);
        let data = [0u8, 0, 0, 7];
        let result = LoopbackProtocol.parse(&data, &ctx).unwrap();
        assert_eq!(result.hint("ethertype"), None);
    }
}
