//! Connectionless (UDP) flow grouping.
//!
//! [`DatagramReassembler`] buffers datagrams per [`FlowKey`] and hands them
//! to the listener as [`DatagramGroup`](crate::listener::DatagramGroup)s,
//! in arrival order. A group is released when it is full, when its flow
//! goes idle, or on a final flush.

mod flow;
mod manager;

pub use flow::FlowKey;
pub use manager::{DatagramConfig, DatagramReassembler, DatagramStats};
