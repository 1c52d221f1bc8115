//! IPv4 protocol parser.

use etherparse::Ipv4HeaderSlice;
use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

const IPV4_MIN_HEADER_LEN: usize = 20;

/// IPv4 protocol parser.
///
/// The payload handed on is cut to `total_len`, so link-layer padding never
/// reaches the transport parsers. Non-first fragments end the chain with an
/// opaque payload since they carry no transport header.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Protocol;

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Ipv4
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == ethertype::IPV4 as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(too_short("ipv4", IPV4_MIN_HEADER_LEN, data.len()));
        }

        let ipv4 = Ipv4HeaderSlice::from_slice(data).map_err(|e| ProtocolError::InvalidField {
            protocol: "ipv4",
            field: "header",
            reason: e.to_string(),
        })?;

        let header_len = ipv4.slice().len();
        let total_len = ipv4.total_len() as usize;
        // Segmentation offload captures report a zero total length.
        let end = if total_len == 0 {
            data.len()
        } else {
            total_len.min(data.len())
        };
        let payload = &data[header_len..end.max(header_len)];

        if ipv4.fragments_offset().value() != 0 {
            return Ok(ParseResult::terminal(header_len, payload));
        }

        let protocol = ipv4.protocol().0;
        let mut child_hints = SmallVec::new();
        child_hints.push(("ip_protocol", protocol as u64));
        child_hints.push(("ip_version", 4));

        // IP-in-IP: let the inner network parser pick the payload up.
        if protocol == ip_proto::IPIP {
            child_hints.push(("ethertype", ethertype::IPV4 as u64));
        } else if protocol == ip_proto::IPV6_IN_IP {
            child_hints.push(("ethertype", ethertype::IPV6 as u64));
        }

        Ok(ParseResult::success(header_len, payload, child_hints))
    }
}
