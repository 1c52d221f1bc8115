//! TCP protocol parser.

use etherparse::TcpHeaderSlice;

use super::{ip_proto, too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

const TCP_MIN_HEADER_LEN: usize = 20;

/// TCP flag bits (low 9 bits of the flags word).
pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
}

/// TCP protocol parser.
///
/// The segment payload is left opaque; the stream reassembler picks it up
/// from the packet's `Data` layer.
#[derive(Debug, Clone, Copy)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Tcp
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == ip_proto::TCP as u64 => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        if data.len() < TCP_MIN_HEADER_LEN {
            return Err(too_short("tcp", TCP_MIN_HEADER_LEN, data.len()));
        }

        let tcp = TcpHeaderSlice::from_slice(data).map_err(|e| ProtocolError::InvalidField {
            protocol: "tcp",
            field: "data_offset",
            reason: e.to_string(),
        })?;

        let header_len = tcp.slice().len();
        Ok(ParseResult::terminal(header_len, &data[header_len..])
            .with_hint("src_port", tcp.source_port() as u64)
            .with_hint("dst_port", tcp.destination_port() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LinkType;

    fn tcp_header(data_offset: u8) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&443u16.to_be_bytes());
        header.extend_from_slice(&51000u16.to_be_bytes());
        header.extend_from_slice(&1000u32.to_be_bytes());
        header.extend_from_slice(&0u32.to_be_bytes());
        header.push(data_offset << 4);
        header.push(flags::ACK as u8);
        header.extend_from_slice(&[0xff, 0xff, 0, 0, 0, 0]);
        header
    }

    fn ctx() -> ParseContext {
        let mut ctx = ParseContext::new(LinkType::ETHERNET);
        ctx.parent = Some(LayerKind::Ipv4);
        ctx.set_hint("ip_protocol", 6);
        ctx
    }

    // Test 1: options are part of the header, payload is opaque
    #[test]
    fn test_parse_with_options() {
        let mut data = tcp_header(6);
        data.extend_from_slice(&[1, 1, 1, 0]);
        data.extend_from_slice(b"GET /");

        let result = TcpProtocol.parse(&data, &ctx()).unwrap();
        assert_eq!(result.header_len, 24);
        assert_eq!(result.remaining, b"GET /");
        assert!(result.opaque_payload);
        assert_eq!(result.hint("src_port"), Some(443));
    }

    // Test 2: data offset below the minimum
    #[test]
    fn test_bad_data_offset() {
        let data = tcp_header(4);
        assert!(matches!(
            TcpProtocol.parse(&data, &ctx()),
            Err(ProtocolError::InvalidField { protocol: "tcp", .. })
        ));
    }

    // Test 3: only matches protocol 6
    #[test]
    fn test_can_parse() {
        let mut ctx = ctx();
        assert!(TcpProtocol.can_parse(&ctx).is_some());
        ctx.set_hint("ip_protocol", 17);
        assert!(TcpProtocol.can_parse(&ctx).is_none());
    }
}
