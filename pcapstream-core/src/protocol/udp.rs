//! UDP protocol parser.

use etherparse::UdpHeaderSlice;

use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

const UDP_HEADER_LEN: usize = 8;

/// UDP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Udp
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == ip_proto::UDP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        let udp = UdpHeaderSlice::from_slice(data)
            .map_err(|_| too_short("udp", UDP_HEADER_LEN, data.len()))?;

        // A zero length is legal for jumbograms; otherwise trust the header.
        let length = udp.length() as usize;
        let end = if length >= UDP_HEADER_LEN {
            length.min(data.len())
        } else {
            data.len()
        };

        Ok(ParseResult::terminal(UDP_HEADER_LEN, &data[UDP_HEADER_LEN..end])
            .with_hint("src_port", udp.source_port() as u64)
            .with_hint("dst_port", udp.destination_port() as u64))
    }
}
