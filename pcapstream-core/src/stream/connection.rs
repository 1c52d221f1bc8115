use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::packet::Timestamp;

/// One side of a conversation.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(addr) => write!(f, "{}:{}", addr, self.port),
            IpAddr::V6(addr) => write!(f, "[{}]:{}", addr, self.port),
        }
    }
}

/// Normalized connection key (lower endpoint first for consistent lookup).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ConnectionKey {
    a: Endpoint,
    b: Endpoint,
}

impl ConnectionKey {
    /// Create a normalized connection key.
    /// Both directions of a connection map to the same key.
    pub fn new(src: Endpoint, dst: Endpoint) -> Self {
        if src <= dst {
            Self { a: src, b: dst }
        } else {
            Self { a: dst, b: src }
        }
    }

    /// The two endpoints, lower first.
    pub fn endpoints(&self) -> (Endpoint, Endpoint) {
        (self.a, self.b)
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// Direction of data flow in a TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ToServer,
    ToClient,
}

impl Direction {
    /// Return a string representation of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ToServer => "to_server",
            Direction::ToClient => "to_client",
        }
    }

    pub fn reverse(&self) -> Direction {
        match self {
            Direction::ToServer => Direction::ToClient,
            Direction::ToClient => Direction::ToServer,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Direction::ToServer => 0,
            Direction::ToClient => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TCP connection state (simplified state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Only handshake packets seen so far.
    Embryonic,
    Established,
    /// One side has sent FIN.
    HalfClosed,
    Closed,
}

impl ConnectionState {
    /// Return a string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Embryonic => "embryonic",
            ConnectionState::Established => "established",
            ConnectionState::HalfClosed => "half_closed",
            ConnectionState::Closed => "closed",
        }
    }
}

/// TCP flags for state transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
}

/// A tracked TCP connection.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: u64,
    pub key: ConnectionKey,
    pub client: Endpoint,
    pub server: Endpoint,
    pub state: ConnectionState,

    /// Set once each side has sent FIN, indexed by direction.
    pub fin_seen: [bool; 2],

    /// Timing.
    pub start_time: Timestamp,
    pub last_activity: Timestamp,

    /// Packet counts.
    pub packets_to_server: u64,
    pub packets_to_client: u64,

    /// Payload bytes seen on the wire, before reassembly.
    pub bytes_to_server: u64,
    pub bytes_to_client: u64,

    /// Frame references.
    pub first_frame: u64,
    pub last_frame: u64,
}

impl Connection {
    /// Determine direction based on the sending endpoint.
    pub fn direction(&self, src: Endpoint) -> Direction {
        if src == self.client {
            Direction::ToServer
        } else {
            Direction::ToClient
        }
    }

    /// Sending endpoint for a direction.
    pub fn source(&self, direction: Direction) -> Endpoint {
        match direction {
            Direction::ToServer => self.client,
            Direction::ToClient => self.server,
        }
    }
}

/// Tracks TCP connections.
#[derive(Debug)]
pub struct ConnectionTracker {
    connections: HashMap<ConnectionKey, Connection>,
    next_id: u64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    /// Get or create a connection for the given segment.
    /// Returns (connection, direction, created).
    pub fn get_or_create(
        &mut self,
        src: Endpoint,
        dst: Endpoint,
        flags: TcpFlags,
        frame_number: u64,
        timestamp: Timestamp,
    ) -> (&mut Connection, Direction, bool) {
        let key = ConnectionKey::new(src, dst);
        let mut created = false;

        let next_id = &mut self.next_id;
        let conn = self.connections.entry(key.clone()).or_insert_with(|| {
            created = true;
            // SYN-ACK seen first: the receiver is the client.
            let (client, server) = if flags.syn && flags.ack {
                (dst, src)
            } else {
                (src, dst)
            };
            let id = *next_id;
            *next_id += 1;
            Connection {
                id,
                key,
                client,
                server,
                state: ConnectionState::Embryonic,
                fin_seen: [false; 2],
                start_time: timestamp,
                last_activity: timestamp,
                packets_to_server: 0,
                packets_to_client: 0,
                bytes_to_server: 0,
                bytes_to_client: 0,
                first_frame: frame_number,
                last_frame: frame_number,
            }
        });

        // Any packet counts as activity, pure ACKs included.
        if timestamp > conn.last_activity {
            conn.last_activity = timestamp;
        }
        conn.last_frame = frame_number;

        let direction = conn.direction(src);
        (conn, direction, created)
    }

    /// Update connection state based on TCP flags.
    pub fn update_state(
        conn: &mut Connection,
        flags: TcpFlags,
        direction: Direction,
        payload_len: usize,
    ) {
        use ConnectionState::*;

        match direction {
            Direction::ToServer => {
                conn.packets_to_server += 1;
                conn.bytes_to_server += payload_len as u64;
            }
            Direction::ToClient => {
                conn.packets_to_client += 1;
                conn.bytes_to_client += payload_len as u64;
            }
        }

        if flags.rst {
            conn.state = Closed;
            return;
        }
        if flags.fin {
            conn.fin_seen[direction.index()] = true;
        }

        conn.state = match conn.state {
            Closed => Closed,
            _ if conn.fin_seen[0] && conn.fin_seen[1] => Closed,
            _ if flags.fin => HalfClosed,
            // Handshake packets without data keep it embryonic
            Embryonic if flags.syn && payload_len == 0 => Embryonic,
            Embryonic => Established,
            current => current,
        };
    }

    /// Get a connection by key.
    pub fn get(&self, key: &ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    pub fn get_mut(&mut self, key: &ConnectionKey) -> Option<&mut Connection> {
        self.connections.get_mut(key)
    }

    /// Remove a connection, returning its final state.
    pub fn remove(&mut self, key: &ConnectionKey) -> Option<Connection> {
        self.connections.remove(key)
    }

    /// Get all connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Keys of connections with no activity for more than `timeout` before `now`.
    pub fn idle_keys(&self, now: Timestamp, timeout: Duration) -> Vec<ConnectionKey> {
        self.keys_where(|c| now.saturating_elapsed_since(c.last_activity) > timeout)
    }

    /// Keys of all connections.
    pub fn all_keys(&self) -> Vec<ConnectionKey> {
        self.keys_where(|_| true)
    }

    /// Matching keys in creation order, so eviction output is deterministic.
    fn keys_where(&self, pred: impl Fn(&Connection) -> bool) -> Vec<ConnectionKey> {
        let mut keys: Vec<_> = self
            .connections
            .values()
            .filter(|c| pred(c))
            .map(|c| (c.id, c.key.clone()))
            .collect();
        keys.sort_by_key(|(id, _)| *id);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
