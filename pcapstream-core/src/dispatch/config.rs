use crate::datagram::DatagramConfig;
use crate::stream::StreamConfig;

/// What to do with a packet whose dissection stopped at a layer nobody
/// decodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownLayerPolicy {
    /// Return the packet to the pool without telling the listener.
    #[default]
    Discard,
    /// Hand it to [`Listener::accept_error`](crate::Listener::accept_error).
    Report,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Create the TCP stream reassembler
    pub stream_reassembly: bool,
    /// Create the UDP datagram reassembler
    pub datagram_reassembly: bool,
    pub unknown_layer: UnknownLayerPolicy,
    /// Packets pre-allocated in the pool
    pub pool_capacity: usize,
    pub stream: StreamConfig,
    pub datagram: DatagramConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            stream_reassembly: true,
            datagram_reassembly: true,
            unknown_layer: UnknownLayerPolicy::Discard,
            pool_capacity: 32,
            stream: StreamConfig::default(),
            datagram: DatagramConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Configuration with both reassemblers disabled: every parsed packet
    /// goes straight to the listener.
    pub fn pass_through() -> Self {
        Self {
            stream_reassembly: false,
            datagram_reassembly: false,
            ..Self::default()
        }
    }
}
