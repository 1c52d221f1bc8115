//! Linux SLL (Sockaddr Link Layer) protocol parser.
//!
//! Parses Linux cooked capture headers (LINKTYPE_LINUX_SLL = 113).
//! This format is used when capturing on the "any" interface.

use smallvec::SmallVec;

use super::{too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::{LayerKind, LinkType};

/// Linux SLL header length in bytes.
pub const LINUX_SLL_HEADER_LEN: usize = 16;

/// ARPHRD types (link layer hardware types).
pub mod arphrd {
    pub const ETHER: u16 = 1;
    pub const LOOPBACK: u16 = 772;
    pub const IPGRE: u16 = 778;
    pub const NETLINK: u16 = 824;
}

/// Linux SLL protocol parser.
///
/// The protocol field carries an EtherType for every hardware type we
/// decode; netlink captures reuse it for the netlink family and get no
/// hint, which surfaces as an unrecognized layer.
#[derive(Debug, Clone, Copy)]
pub struct LinuxSllProtocol;

impl Protocol for LinuxSllProtocol {
    fn name(&self) -> &'static str {
        "linux_sll"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::LinuxSll
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.is_root() && context.link_type == LinkType::LINUX_SLL {
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
        if data.len() < LINUX_SLL_HEADER_LEN {
            return Err(too_short("linux_sll", LINUX_SLL_HEADER_LEN, data.len()));
        }

        let arphrd_type = u16::from_be_bytes([data[2], data[3]]);
        let protocol = u16::from_be_bytes([data[14], data[15]]);

        let mut child_hints = SmallVec::new();
        if arphrd_type != arphrd::NETLINK {
            child_hints.push(("ethertype", protocol as u64));
        }

        Ok(ParseResult::success(
            LINUX_SLL_HEADER_LEN,
            &data[LINUX_SLL_HEADER_LEN..],
            child_hints,
        ))
    }
}
