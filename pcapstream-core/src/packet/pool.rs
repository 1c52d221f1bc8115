use super::Packet;

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Packets ever constructed by the pool.
    pub allocated: usize,
    /// Packets currently claimed.
    pub in_use: usize,
    /// Packets sitting on the free list.
    pub idle: usize,
    /// Most packets claimed at the same time.
    pub high_water: usize,
}

/// Free list of reusable packets.
///
/// `claim` hands out a clean packet, constructing one only when the free
/// list is empty; `release` takes ownership back. Since a released packet
/// is moved into the pool, it cannot be touched or released twice by the
/// caller.
#[derive(Debug, Default)]
pub struct PacketPool {
    free: Vec<Packet<'static>>,
    allocated: usize,
    in_use: usize,
    high_water: usize,
}

impl PacketPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with `capacity` packets already on the free list.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut free = Vec::with_capacity(capacity);
        free.resize_with(capacity, Packet::new);
        Self {
            free,
            allocated: capacity,
            in_use: 0,
            high_water: 0,
        }
    }

    /// Take a clean packet from the pool.
    pub fn claim(&mut self) -> Packet<'static> {
        self.in_use += 1;
        self.high_water = self.high_water.max(self.in_use);
        match self.free.pop() {
            Some(packet) => packet,
            None => {
                self.allocated += 1;
                Packet::new()
            }
        }
    }

    /// Return a packet to the pool. Borrowed bytes are dropped, not copied.
    pub fn release(&mut self, packet: Packet<'_>) {
        self.in_use = self.in_use.saturating_sub(1);
        self.free.push(packet.recycle());
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            in_use: self.in_use,
            idle: self.free.len(),
            high_water: self.high_water,
        }
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
