//! Parse context and result types.

use smallvec::SmallVec;

use crate::packet::{LayerKind, LinkType};

/// Hint entry for child protocol detection: (hint_name, value).
pub type HintEntry = (&'static str, u64);

/// Context passed through the parsing chain.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Link type from the capture header.
    pub link_type: LinkType,

    /// Layer that identified this protocol.
    pub parent: Option<LayerKind>,

    /// Protocol-specific hints (e.g., ethertype, IP protocol number).
    pub hints: SmallVec<[HintEntry; 4]>,

    /// Offset into the original packet where this protocol's data starts.
    pub offset: usize,
}

impl ParseContext {
    /// Create a new parse context for a packet with the given link type.
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            parent: None,
            hints: SmallVec::new(),
            offset: 0,
        }
    }

    /// Get a hint value by key (linear search, but N is small).
    #[inline]
    pub fn hint(&self, key: &str) -> Option<u64> {
        self.hints.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Set a hint value (updates existing or appends).
    #[inline]
    pub fn set_hint(&mut self, key: &'static str, value: u64) {
        if let Some(entry) = self.hints.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.hints.push((key, value));
        }
    }

    /// Check if we're at the start of the packet (no parent protocol).
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Result of parsing one protocol header.
///
/// `remaining` always starts directly after the header; it may end before
/// the end of the input when the header declares a shorter length (e.g.
/// Ethernet padding after an IPv4 datagram).
#[derive(Debug, Clone)]
pub struct ParseResult<'data> {
    /// Bytes consumed by this header.
    pub header_len: usize,

    /// Bytes for the next layer.
    pub remaining: &'data [u8],

    /// Hints for child protocol identification. Typically 2-4 entries.
    pub child_hints: SmallVec<[HintEntry; 4]>,

    /// The payload is not decoded further and becomes a `Data` layer.
    pub opaque_payload: bool,
}

impl<'data> ParseResult<'data> {
    /// Header parsed; continue with a child parser.
    pub fn success(
        header_len: usize,
        remaining: &'data [u8],
        child_hints: SmallVec<[HintEntry; 4]>,
    ) -> Self {
        Self {
            header_len,
            remaining,
            child_hints,
            opaque_payload: false,
        }
    }

    /// Header parsed; whatever follows is opaque payload.
    pub fn terminal(header_len: usize, remaining: &'data [u8]) -> Self {
        Self {
            header_len,
            remaining,
            child_hints: SmallVec::new(),
            opaque_payload: true,
        }
    }

    /// Add a child hint (builder style).
    pub fn with_hint(mut self, key: &'static str, value: u64) -> Self {
        self.child_hints.push((key, value));
        self
    }

    /// Get a child hint value by key.
    pub fn hint(&self, key: &str) -> Option<u64> {
        self.child_hints
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: set_hint replaces existing values
    #[test]
    fn test_set_hint_updates() {
        let mut ctx = ParseContext::new(LinkType::ETHERNET);
        assert!(ctx.is_root());
        ctx.set_hint("ethertype", 0x0800);
        ctx.set_hint("ethertype", 0x86dd);
        assert_eq!(ctx.hints.len(), 1);
        assert_eq!(ctx.hint("ethertype"), Some(0x86dd));
        assert_eq!(ctx.hint("ip_protocol"), None);
    }

    // Test 2: terminal results carry no hints
    #[test]
    fn test_terminal_result() {
        let data = [1u8, 2, 3, 4];
        let result = ParseResult::terminal(2, &data[2..]);
        assert!(result.opaque_payload);
        assert!(result.child_hints.is_empty());
        assert_eq!(result.remaining, &[3, 4]);

        let chained = ParseResult::success(2, &data[2..], SmallVec::new()).with_hint("ip_protocol", 6);
        assert_eq!(chained.hint("ip_protocol"), Some(6));
    }
}
