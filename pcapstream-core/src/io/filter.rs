//! BPF filters for file sources.
//!
//! With the `libpcap` feature, expressions are compiled against a dead
//! libpcap handle of the capture's link type and evaluated per frame in
//! user space. Without it, any expression is rejected with
//! [`CaptureError::FilterUnsupported`].

use crate::error::CaptureError;
use crate::packet::LinkType;

/// A compiled filter expression.
pub struct PacketFilter {
    expression: String,
    #[cfg(feature = "libpcap")]
    program: pcap::BpfProgram,
}

impl std::fmt::Debug for PacketFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketFilter")
            .field("expression", &self.expression)
            .finish()
    }
}

impl PacketFilter {
    /// Compile `expression` for frames of `link_type`.
    #[cfg(feature = "libpcap")]
    pub fn compile(
        expression: &str,
        link_type: LinkType,
        _source_name: &str,
    ) -> Result<Self, CaptureError> {
        let compile_error = |e: pcap::Error| CaptureError::FilterCompile {
            expression: expression.to_string(),
            reason: e.to_string(),
        };
        let dead = pcap::Capture::dead(pcap::Linktype(link_type.0 as i32)).map_err(compile_error)?;
        let program = dead.compile(expression, true).map_err(compile_error)?;
        Ok(PacketFilter {
            expression: expression.to_string(),
            program,
        })
    }

    /// Compile `expression` for frames of `link_type`.
    #[cfg(not(feature = "libpcap"))]
    pub fn compile(
        _expression: &str,
        _link_type: LinkType,
        source_name: &str,
    ) -> Result<Self, CaptureError> {
        Err(CaptureError::FilterUnsupported {
            source_name: source_name.to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether a frame passes the filter.
    #[cfg(feature = "libpcap")]
    pub fn matches(&self, data: &[u8]) -> bool {
        self.program.filter(data)
    }

    /// Whether a frame passes the filter.
    #[cfg(not(feature = "libpcap"))]
    pub fn matches(&self, _data: &[u8]) -> bool {
        true
    }
}
