//! IPv6 protocol parser.
//!
//! Extension headers are folded into the IPv6 layer: the layer covers the
//! fixed header plus every extension header, and the next parser sees the
//! upper-layer protocol directly.

use etherparse::Ipv6HeaderSlice;
use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

const IPV6_HEADER_LEN: usize = 40;

/// IPv6 next header values for extension headers.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AH: u8 = 51;
    pub const NO_NEXT_HEADER: u8 = 59;
    pub const DESTINATION: u8 = 60;
}

/// IPv6 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Protocol;

impl Protocol for Ipv6Protocol {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Ipv6
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV6 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < IPV6_HEADER_LEN {
            return Err(too_short("ipv6", IPV6_HEADER_LEN, data.len()));
        }

        let ipv6 = Ipv6HeaderSlice::from_slice(data).map_err(|e| ProtocolError::InvalidField {
            protocol: "ipv6",
            field: "header",
            reason: e.to_string(),
        })?;

        let payload_len = ipv6.payload_length() as usize;
        // Jumbograms and offloaded captures carry a zero payload length.
        let end = if payload_len == 0 {
            data.len()
        } else {
            (IPV6_HEADER_LEN + payload_len).min(data.len())
        };

        let mut next = ipv6.next_header().0;
        let mut pos = IPV6_HEADER_LEN;
        let mut later_fragment = false;

        loop {
            let ext_len = match next {
                next_header::HOP_BY_HOP | next_header::ROUTING | next_header::DESTINATION => {
                    if end < pos + 2 {
                        return Err(too_short("ipv6", pos + 2, end));
                    }
                    (data[pos + 1] as usize + 1) * 8
                }
                next_header::FRAGMENT => {
                    if end < pos + 8 {
                        return Err(too_short("ipv6", pos + 8, end));
                    }
                    let offset = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) >> 3;
                    later_fragment = offset != 0;
                    8
                }
                next_header::AH => {
                    if end < pos + 2 {
                        return Err(too_short("ipv6", pos + 2, end));
                    }
                    (data[pos + 1] as usize + 2) * 4
                }
                _ => break,
            };
            if end < pos + ext_len {
                return Err(too_short("ipv6", pos + ext_len, end));
            }
            next = data[pos];
            pos += ext_len;
            if later_fragment {
                break;
            }
        }

        let payload = &data[pos..end];
        if later_fragment || next == next_header::NO_NEXT_HEADER {
            return Ok(ParseResult::terminal(pos, payload));
        }

        let mut child_hints = SmallVec::new();
        child_hints.push(("ip_protocol", next as u64));
        child_hints.push(("ip_version", 6));
        if next == ip_proto::IPIP {
            child_hints.push(("ethertype", ethertype::IPV4 as u64));
        } else if next == ip_proto::IPV6_IN_IP {
            child_hints.push(("ethertype", ethertype::IPV6 as u64));
        }

        Ok(ParseResult::success(pos, payload, child_hints))
    }
}
