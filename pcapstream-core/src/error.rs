//! Error types for pcapstream-core.
//!
//! - [`enum@Error`] - Errors returned by dispatcher operations
//! - [`CaptureError`] - Errors from opening, filtering or reading a capture source
//! - [`ParseError`] - Per-packet dissection outcome handed to the listener
//! - [`ProtocolError`] - Byte-level header failures inside a single parser
//!
//! Per-packet errors never abort a read loop. Only [`enum@Error`] values are
//! returned to callers; [`ParseError`] values go to
//! [`Listener::accept_error`](crate::Listener::accept_error).

use thiserror::Error;

use crate::packet::LayerKind;

/// Main error type for pcapstream-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A capture source is already open on this dispatcher
    #[error("Capture source already open: {source_name}")]
    AlreadyOpen { source_name: String },

    /// The operation requires an open capture source
    #[error("No capture source is open")]
    NotOpen,

    /// Error opening, filtering or reading a capture source
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

/// Errors related to capture sources.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// The source could not be opened
    #[error("Could not open {source_name}: {reason}")]
    Open { source_name: String, reason: String },

    /// Invalid capture file format
    #[error("Invalid capture format: {reason}")]
    InvalidFormat { reason: String },

    /// The filter expression failed to compile or activate
    #[error("Could not compile filter '{expression}': {reason}")]
    FilterCompile { expression: String, reason: String },

    /// Filters require the `libpcap` feature
    #[error("Filter expressions are not supported for {source_name} (build with the `libpcap` feature)")]
    FilterUnsupported { source_name: String },

    /// The read loop itself failed
    #[error("Capture read failed on {source_name}: {reason}")]
    Read { source_name: String, reason: String },
}

/// Why a single packet could not be dissected.
///
/// `UnrecognizedLayer` is the soft case: the bytes may be fine, we just
/// do not decode that protocol. `MalformedData` means a known header was
/// truncated or inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No parser claims the next layer
    #[error("Unrecognized layer after {}: {detail}", parent_name(.after))]
    UnrecognizedLayer {
        after: Option<LayerKind>,
        detail: String,
    },

    /// A known layer failed to parse
    #[error("Malformed {layer} layer: {source}")]
    MalformedData {
        layer: LayerKind,
        #[source]
        source: ProtocolError,
    },
}

fn parent_name(after: &Option<LayerKind>) -> &'static str {
    match after {
        Some(kind) => kind.as_str(),
        None => "link header",
    }
}

impl ParseError {
    /// True for the soft "we do not decode this" condition.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, ParseError::UnrecognizedLayer { .. })
    }
}

/// Errors related to protocol parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet too short for protocol header
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Invalid header field value
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
