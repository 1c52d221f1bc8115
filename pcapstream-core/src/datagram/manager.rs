use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};

use super::FlowKey;
use crate::listener::{DatagramGroup, GroupReason, SharedListener};
use crate::packet::{Packet, PacketPool, Timestamp};
use crate::stream::FlushScope;

/// Configuration for the [`DatagramReassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatagramConfig {
    /// Flows with no datagrams for longer than this are evicted.
    pub idle_timeout: Duration,
    /// A group is released as soon as it holds this many datagrams.
    pub max_group_len: usize,
    /// How often `set_now` sweeps for idle flows; `None` disables it.
    pub sweep_interval: Option<Duration>,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            max_group_len: 32,
            sweep_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// Datagram engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatagramStats {
    pub flows_opened: u64,
    pub flows_closed: u64,
    pub datagrams: u64,
    pub groups_released: u64,
}

/// State for one live flow.
#[derive(Debug)]
struct Flow {
    id: u64,
    /// Owned datagrams waiting to be released, in arrival order.
    packets: Vec<Packet<'static>>,
    last_activity: Timestamp,
    total_datagrams: u64,
}

/// Groups connectionless datagrams by flow.
///
/// No reordering is attempted. Buffered packets are owned copies; when a
/// group is released they are handed back to the caller's [`PacketPool`].
pub struct DatagramReassembler {
    flows: HashMap<FlowKey, Flow>,
    listener: SharedListener,
    config: DatagramConfig,
    now: Timestamp,
    last_sweep: Option<Timestamp>,
    next_id: u64,
    stats: DatagramStats,
}

impl DatagramReassembler {
    pub fn new(config: DatagramConfig, listener: SharedListener) -> Self {
        Self {
            flows: HashMap::new(),
            listener,
            config,
            now: Timestamp::ZERO,
            last_sweep: None,
            next_id: 0,
            stats: DatagramStats::default(),
        }
    }

    pub fn set_listener(&mut self, listener: SharedListener) {
        self.listener = listener;
    }

    /// Advance logical time, sweeping idle flows when the sweep interval
    /// has passed.
    pub fn set_now(&mut self, now: Timestamp, pool: &mut PacketPool) {
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
                self.flush(FlushScope::Idle, pool);
            }
            Some(_) => {}
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Take ownership of a datagram and add it to its flow's group.
    ///
    /// A packet without a UDP/IP header pair is handed back untouched.
    pub fn process<'a>(
        &mut self,
        packet: Packet<'a>,
        pool: &mut PacketPool,
    ) -> Option<Packet<'a>> {
        let Some(key) = FlowKey::from_packet(&packet) else {
            return Some(packet);
        };
        let timestamp = packet.ts();

        let frame_number = packet.frame_number();
        let next_id = &mut self.next_id;
        let stats = &mut self.stats;
        let flow = self.flows.entry(key.clone()).or_insert_with(|| {
            *next_id += 1;
            stats.flows_opened += 1;
            debug!(id = *next_id, flow = %key, frame = frame_number, "new flow");
            Flow {
                id: *next_id,
                packets: Vec::new(),
                last_activity: timestamp,
                total_datagrams: 0,
            }
        });
        flow.last_activity = flow.last_activity.max(timestamp);
        flow.total_datagrams += 1;
        flow.packets.push(packet.into_owned());
        self.stats.datagrams += 1;

        if flow.packets.len() >= self.config.max_group_len.max(1) {
            let packets = std::mem::take(&mut flow.packets);
            self.release(&key, packets, GroupReason::GroupFull, pool);
        }
        None
    }

    /// Hand a group to the listener, then return its packets to the pool.
    fn release(
        &mut self,
        key: &FlowKey,
        mut packets: Vec<Packet<'static>>,
        reason: GroupReason,
        pool: &mut PacketPool,
    ) {
        if packets.is_empty() {
            return;
        }
        self.stats.groups_released += 1;
        trace!(flow = %key, len = packets.len(), reason = reason.as_str(), "datagram group");
        self.listener.borrow_mut().accept_datagrams(&DatagramGroup {
            flow: key,
            packets: &packets,
            reason,
        });
        for packet in packets.drain(..) {
            pool.release(packet);
        }
    }

    /// Evict flows, releasing whatever they still hold.
    ///
    /// Returns the number of flows evicted.
    pub fn flush(&mut self, scope: FlushScope, pool: &mut PacketPool) -> usize {
        let now = self.now;
        let timeout = self.config.idle_timeout;
        let mut keys: Vec<(u64, FlowKey)> = self
            .flows
            .iter()
            .filter(|(_, flow)| {
                scope == FlushScope::All || now.saturating_elapsed_since(flow.last_activity) > timeout
            })
            .map(|(key, flow)| (flow.id, key.clone()))
            .collect();
        keys.sort_unstable();

        let reason = match scope {
            FlushScope::Idle => GroupReason::IdleEvicted,
            FlushScope::All => GroupReason::Flushed,
        };
        for (_, key) in &keys {
            if let Some(flow) = self.flows.remove(key) {
                self.stats.flows_closed += 1;
                debug!(
                    id = flow.id,
                    flow = %key,
                    datagrams = flow.total_datagrams,
                    reason = reason.as_str(),
                    "flow closed"
                );
                self.release(key, flow.packets, reason, pool);
            }
        }
        keys.len()
    }

    /// Number of live flows.
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Datagrams currently held across all flows.
    pub fn buffered(&self) -> usize {
        self.flows.values().map(|flow| flow.packets.len()).sum()
    }

    pub fn stats(&self) -> DatagramStats {
        self.stats
    }

    pub fn config(&self) -> &DatagramConfig {
        &self.config
    }
}
