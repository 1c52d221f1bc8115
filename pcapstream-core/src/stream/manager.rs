use std::collections::HashMap;
use std::time::Duration;

use etherparse::TcpHeaderSlice;
use tracing::{debug, trace};

use super::reassembly::{Delivery, StreamBuffer, StreamStats};
use super::{ConnectionKey, ConnectionState, ConnectionTracker, Direction, Endpoint, TcpFlags};
use crate::listener::{CloseReason, SharedListener, StreamData, StreamSummary};
use crate::packet::{LayerKind, Packet, Timestamp};

/// Configuration for the [`StreamReassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Connections with no packets for longer than this are evicted.
    pub idle_timeout: Duration,
    /// Maximum out-of-order bytes held per direction.
    pub max_buffered_bytes: usize,
    /// How often `set_now` sweeps for idle connections; `None` leaves
    /// eviction to explicit [`StreamReassembler::flush`] calls.
    pub sweep_interval: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),   // 5 minutes
            max_buffered_bytes: 16 * 1024 * 1024,     // 16 MB per direction
            sweep_interval: Some(Duration::from_secs(300)),
        }
    }
}

/// What a flush evicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    /// Only state idle for longer than the configured timeout
    Idle,
    /// Everything, as a final drain
    All,
}

/// Reassembler-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub connections_opened: u64,
    pub connections_closed: u64,
    /// Segments absorbed after their connection finished or was reset
    pub late_segments: u64,
    /// Per-direction counters summed over all connections
    pub streams: StreamStats,
}

/// Key for stream buffer lookup.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct StreamKey {
    pub connection_id: u64,
    pub direction: Direction,
}

/// The fields of a TCP segment the reassembler needs.
struct Segment<'p> {
    src: Endpoint,
    dst: Endpoint,
    seq: u32,
    flags: TcpFlags,
    payload: &'p [u8],
}

impl<'p> Segment<'p> {
    fn from_packet(packet: &'p Packet<'_>) -> Option<Self> {
        let layer = packet.find_layer(LayerKind::Tcp)?;
        let tcp = TcpHeaderSlice::from_slice(packet.layer_data(layer)).ok()?;
        let (src_ip, dst_ip) = packet.ip_addrs()?;
        Some(Segment {
            src: Endpoint::new(src_ip, tcp.source_port()),
            dst: Endpoint::new(dst_ip, tcp.destination_port()),
            seq: tcp.sequence_number(),
            flags: TcpFlags {
                syn: tcp.syn(),
                ack: tcp.ack(),
                fin: tcp.fin(),
                rst: tcp.rst(),
            },
            payload: packet.payload(),
        })
    }
}

/// Reassembles TCP connections into ordered byte streams.
///
/// Each direction is delivered to the listener as contiguous chunks, at most
/// one per processed segment. Connections are released when both sides
/// have sent FIN, on RST, or by [`flush`](Self::flush).
pub struct StreamReassembler {
    tracker: ConnectionTracker,
    streams: HashMap<StreamKey, StreamBuffer>,
    /// Connections that ended with FIN or RST, by the time they last saw
    /// a segment. Pruned once idle for longer than the idle timeout.
    finished: HashMap<ConnectionKey, Timestamp>,
    listener: SharedListener,
    config: StreamConfig,
    /// Latest capture time seen.
    now: Timestamp,
    last_sweep: Option<Timestamp>,
    /// Reused buffer for chunks assembled from several segments.
    scratch: Vec<u8>,
    stats: ReassemblyStats,
}

impl StreamReassembler {
    pub fn new(config: StreamConfig, listener: SharedListener) -> Self {
        Self {
            tracker: ConnectionTracker::new(),
            streams: HashMap::new(),
            finished: HashMap::new(),
            listener,
            config,
            now: Timestamp::ZERO,
            last_sweep: None,
            scratch: Vec::new(),
            stats: ReassemblyStats::default(),
        }
    }

    /// Redirect future deliveries and close notifications.
    pub fn set_listener(&mut self, listener: SharedListener) {
        self.listener = listener;
    }

    /// Advance logical time. Never reorders delivery; it only drives
    /// idle eviction.
    pub fn set_now(&mut self, now: Timestamp) {
        if now > self.now {
            self.now = now;
        }
        let Some(interval) = self.config.sweep_interval else {
            return;
        };
        match self.last_sweep {
            None => self.last_sweep = Some(self.now),
            Some(last) if self.now.saturating_elapsed_since(last) >= interval => {
                self.last_sweep = Some(self.now);
                self.flush(FlushScope::Idle);
            }
            Some(_) => {}
        }
    }

    /// Latest logical time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Feed one packet whose top layers are TCP (optionally with payload).
    ///
    /// Returns `false` if the packet does not carry a usable TCP/IP header
    /// pair; the caller keeps responsibility for it.
    pub fn process(&mut self, packet: &Packet<'_>) -> bool {
        let Some(segment) = Segment::from_packet(packet) else {
            return false;
        };
        let timestamp = packet.ts();

        // Teardown ACKs and retransmissions of a finished connection. Only a
        // new SYN reopens the 4-tuple.
        let tuple = ConnectionKey::new(segment.src, segment.dst);
        if let Some(last_seen) = self.finished.get_mut(&tuple) {
            if !segment.flags.syn {
                if timestamp > *last_seen {
                    *last_seen = timestamp;
                }
                self.stats.late_segments += 1;
                trace!(frame = packet.frame_number(), connection = %tuple, "segment after close");
                return true;
            }
            self.finished.remove(&tuple);
        }

        let (conn, direction, created) = self.tracker.get_or_create(
            segment.src,
            segment.dst,
            segment.flags,
            packet.frame_number(),
            timestamp,
        );
        if created {
            self.stats.connections_opened += 1;
            debug!(
                id = conn.id,
                client = %conn.client,
                server = %conn.server,
                frame = packet.frame_number(),
                "new connection"
            );
        }
        ConnectionTracker::update_state(conn, segment.flags, direction, segment.payload.len());
        let key = conn.key.clone();
        let fin_seen = conn.fin_seen;

        let buffer = self
            .streams
            .entry(StreamKey {
                connection_id: conn.id,
                direction,
            })
            .or_default();

        // SYN consumes one sequence number ahead of any data it carries.
        let data_seq = if segment.flags.syn {
            buffer.set_initial_seq(segment.seq);
            segment.seq.wrapping_add(1)
        } else {
            segment.seq
        };

        let delivery = buffer.insert(
            data_seq,
            segment.payload,
            self.config.max_buffered_bytes,
            &mut self.scratch,
        );
        if segment.flags.fin {
            buffer.mark_fin(data_seq, segment.payload.len());
        }

        match delivery {
            Delivery::Nothing => {
                if !segment.payload.is_empty() {
                    trace!(
                        frame = packet.frame_number(),
                        len = segment.payload.len(),
                        "segment held or dropped"
                    );
                }
            }
            Delivery::Direct { offset, skip } => {
                self.deliver(&key, direction, offset, &segment.payload[skip..], timestamp)
            }
            Delivery::Assembled { offset } => {
                let data = std::mem::take(&mut self.scratch);
                self.deliver(&key, direction, offset, &data, timestamp);
                self.scratch = data;
            }
        }

        if segment.flags.rst {
            self.finish(&key, CloseReason::Reset, timestamp);
        } else if fin_seen[0] && fin_seen[1] {
            if self.fins_complete(&key, fin_seen) {
                self.finish(&key, CloseReason::Finished, timestamp);
            } else if let Some(conn) = self.tracker.get_mut(&key) {
                // Both FINs are in but data before one of them is missing.
                conn.state = ConnectionState::HalfClosed;
            }
        }
        true
    }

    /// Whether every direction that sent a FIN has delivered up to it.
    fn fins_complete(&self, key: &ConnectionKey, fin_seen: [bool; 2]) -> bool {
        let Some(conn) = self.tracker.get(key) else {
            return true;
        };
        [Direction::ToServer, Direction::ToClient]
            .into_iter()
            .filter(|d| fin_seen[d.index()])
            .all(|direction| {
                self.streams
                    .get(&StreamKey {
                        connection_id: conn.id,
                        direction,
                    })
                    .map_or(true, StreamBuffer::is_complete)
            })
    }

    /// Close a connection that ended on the wire and remember its 4-tuple.
    fn finish(&mut self, key: &ConnectionKey, reason: CloseReason, timestamp: Timestamp) {
        self.close(key, reason);
        self.finished.insert(key.clone(), timestamp);
    }

    fn deliver(
        &self,
        key: &ConnectionKey,
        direction: Direction,
        offset: u64,
        data: &[u8],
        timestamp: Timestamp,
    ) {
        let Some(connection) = self.tracker.get(key) else {
            return;
        };
        self.listener.borrow_mut().accept_stream(&StreamData {
            connection,
            direction,
            offset,
            data,
            timestamp,
        });
    }

    /// Evict connections. Pending out-of-order data of evicted connections
    /// is discarded and reported in the close summary.
    ///
    /// Returns the number of connections evicted.
    pub fn flush(&mut self, scope: FlushScope) -> usize {
        let (keys, reason) = match scope {
            FlushScope::Idle => (
                self.tracker.idle_keys(self.now, self.config.idle_timeout),
                CloseReason::IdleEvicted,
            ),
            FlushScope::All => (self.tracker.all_keys(), CloseReason::Flushed),
        };
        for key in &keys {
            self.close(key, reason);
        }
        match scope {
            FlushScope::Idle => {
                let (now, timeout) = (self.now, self.config.idle_timeout);
                self.finished
                    .retain(|_, last_seen| now.saturating_elapsed_since(*last_seen) <= timeout);
            }
            FlushScope::All => self.finished.clear(),
        }
        if !keys.is_empty() {
            debug!(count = keys.len(), ?scope, "connections flushed");
        }
        keys.len()
    }

    fn close(&mut self, key: &ConnectionKey, reason: CloseReason) {
        let Some(mut connection) = self.tracker.remove(key) else {
            return;
        };
        connection.state = ConnectionState::Closed;

        let mut bytes_delivered = 0;
        let mut bytes_discarded = 0;
        for direction in [Direction::ToServer, Direction::ToClient] {
            let stream_key = StreamKey {
                connection_id: connection.id,
                direction,
            };
            if let Some(mut buffer) = self.streams.remove(&stream_key) {
                bytes_discarded += buffer.discard_pending();
                bytes_delivered += buffer.delivered();
                self.stats.streams.merge(buffer.stats());
            }
        }
        self.stats.connections_closed += 1;

        debug!(
            id = connection.id,
            connection = %connection.key,
            %reason,
            bytes_delivered,
            bytes_discarded,
            "connection closed"
        );
        self.listener.borrow_mut().stream_closed(&StreamSummary {
            connection: &connection,
            reason,
            bytes_delivered,
            bytes_discarded,
        });
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.tracker.len()
    }

    /// Look up a live connection.
    pub fn connection(&self, key: &ConnectionKey) -> Option<&super::Connection> {
        self.tracker.get(key)
    }

    /// Counters for closed connections plus the live ones.
    pub fn stats(&self) -> ReassemblyStats {
        let mut stats = self.stats;
        for buffer in self.streams.values() {
            stats.streams.merge(buffer.stats());
        }
        stats
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
