//! Test utilities for protocol parsing.
//!
//! Builds Ethernet/IPv4 frames with `etherparse::PacketBuilder` and wraps
//! them into [`RawFrame`]s the way a capture source would.

use etherparse::PacketBuilder;

use crate::io::RawFrame;
use crate::packet::Timestamp;

pub const CLIENT_MAC: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
pub const SERVER_MAC: [u8; 6] = [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb];
pub const CLIENT_IP: [u8; 4] = [10, 0, 0, 1];
pub const SERVER_IP: [u8; 4] = [10, 0, 0, 2];
pub const CLIENT_PORT: u16 = 40000;
pub const SERVER_PORT: u16 = 80;

/// Builder for Ethernet/IPv4/TCP frames.
#[derive(Debug, Clone)]
pub struct TcpSegmentBuilder {
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: Option<u32>,
    syn: bool,
    fin: bool,
    rst: bool,
    payload: Vec<u8>,
}

impl Default for TcpSegmentBuilder {
    fn default() -> Self {
        Self {
            src_ip: CLIENT_IP,
            dst_ip: SERVER_IP,
            src_port: CLIENT_PORT,
            dst_port: SERVER_PORT,
            seq: 0,
            ack: None,
            syn: false,
            fin: false,
            rst: false,
            payload: Vec::new(),
        }
    }
}

impl TcpSegmentBuilder {
    /// Client-to-server segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-to-client segment.
    pub fn from_server() -> Self {
        Self {
            src_ip: SERVER_IP,
            dst_ip: CLIENT_IP,
            src_port: SERVER_PORT,
            dst_port: CLIENT_PORT,
            ..Self::default()
        }
    }

    pub fn ports(mut self, src_port: u16, dst_port: u16) -> Self {
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    pub fn addrs(mut self, src_ip: [u8; 4], dst_ip: [u8; 4]) -> Self {
        self.src_ip = src_ip;
        self.dst_ip = dst_ip;
        self
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = Some(ack);
        self
    }

    pub fn syn(mut self) -> Self {
        self.syn = true;
        self
    }

    pub fn fin(mut self) -> Self {
        self.fin = true;
        self
    }

    pub fn rst(mut self) -> Self {
        self.rst = true;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut builder = PacketBuilder::ethernet2(CLIENT_MAC, SERVER_MAC)
            .ipv4(self.src_ip, self.dst_ip, 64)
            .tcp(self.src_port, self.dst_port, self.seq, 64240);
        if self.syn {
            builder = builder.syn();
        }
        if self.fin {
            builder = builder.fin();
        }
        if self.rst {
            builder = builder.rst();
        }
        if let Some(ack) = self.ack {
            builder = builder.ack(ack);
        }
        if !self.payload.is_empty() {
            builder = builder.psh();
        }
        let mut frame = Vec::with_capacity(builder.size(self.payload.len()));
        builder.write(&mut frame, &self.payload).unwrap();
        frame
    }
}

/// Client-to-server data segment with ACK set.
pub fn tcp_packet(src_port: u16, dst_port: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
    TcpSegmentBuilder::new()
        .ports(src_port, dst_port)
        .seq(seq)
        .ack(1)
        .payload(payload)
        .build()
}

/// Client-to-server UDP datagram.
pub fn udp_packet(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    udp_packet_between(CLIENT_IP, SERVER_IP, src_port, dst_port, payload)
}

pub fn udp_packet_between(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(CLIENT_MAC, SERVER_MAC)
        .ipv4(src_ip, dst_ip, 64)
        .udp(src_port, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// Ethernet frame carrying an EtherType nobody decodes (LLDP).
pub fn lldp_packet() -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e]);
    frame.extend_from_slice(&CLIENT_MAC);
    frame.extend_from_slice(&[0x88, 0xcc]);
    frame.extend_from_slice(&[0x02, 0x07, 0x04, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    frame
}

/// Wrap bytes as a capture event stamped `frame_number` seconds in.
pub fn frame(data: &[u8], frame_number: u64) -> RawFrame<'_> {
    frame_at(data, frame_number, Timestamp::new(frame_number as i64, 0))
}

pub fn frame_at(data: &[u8], frame_number: u64, timestamp: Timestamp) -> RawFrame<'_> {
    RawFrame {
        frame_number,
        timestamp,
        captured_len: data.len() as u32,
        original_len: data.len() as u32,
        data,
    }
}
