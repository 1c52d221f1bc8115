//! IEEE 802.1Q / 802.1ad VLAN tag parser.

use smallvec::SmallVec;

use super::ethernet::ethertype;
use super::{too_short, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;
use crate::packet::LayerKind;

/// 802.1Q VLAN tag parser.
#[derive(Debug, Clone, Copy)]
pub struct VlanProtocol;

impl Protocol for VlanProtocol {
    fn name(&self) -> &'static str {
        "vlan"
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Vlan
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(etype)
                if etype == ethertype::VLAN as u64
                    || etype == ethertype::QINQ as u64
                    || etype == ethertype::QINQ_LEGACY as u64 =>
            {
                Some(100)
            }
            _ => None,
        }
    }

    fn parse<'a>(
        &self,
        data: &'a [u8],
        _context: &ParseContext,
    ) -> Result<ParseResult<'a>, ProtocolError> {
        // The TPID was consumed by the parent; what is left is TCI + inner EtherType.
        if data.len() < 4 {
            return Err(too_short("vlan", 4, data.len()));
        }

        let tci = u16::from_be_bytes([data[0], data[1]]);
        let inner_ethertype = u16::from_be_bytes([data[2], data[3]]);

        let mut child_hints = SmallVec::new();
        child_hints.push(("ethertype", inner_ethertype as u64));
        child_hints.push(("vlan_id", (tci & 0x0FFF) as u64));

        Ok(ParseResult::success(4, &data[4..], child_hints))
    }
}
