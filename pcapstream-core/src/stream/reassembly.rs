use std::collections::BTreeMap;

use tracing::warn;

/// What a call to [`StreamBuffer::insert`] made deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing new is contiguous with the delivered prefix.
    Nothing,
    /// The segment itself, minus its first `skip` bytes, extends the
    /// stream at `offset`. Nothing was buffered.
    Direct { offset: u64, skip: usize },
    /// The assembled bytes in the caller's scratch buffer extend the
    /// stream at `offset`.
    Assembled { offset: u64 },
}

/// Per-direction reassembly statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Segments carrying payload
    pub segments: u64,
    /// Segments that added nothing new
    pub duplicates: u64,
    /// Segments whose overlapping part was cut away
    pub overlaps_trimmed: u64,
    /// Segments buffered behind a gap
    pub out_of_order: u64,
    /// Segments dropped because the pending buffer was full
    pub overflow_drops: u64,
    pub bytes_delivered: u64,
    pub bytes_discarded: u64,
}

impl StreamStats {
    pub(crate) fn merge(&mut self, other: &StreamStats) {
        self.segments += other.segments;
        self.duplicates += other.duplicates;
        self.overlaps_trimmed += other.overlaps_trimmed;
        self.out_of_order += other.out_of_order;
        self.overflow_drops += other.overflow_drops;
        self.bytes_delivered += other.bytes_delivered;
        self.bytes_discarded += other.bytes_discarded;
    }
}

/// Buffer for one direction of a TCP stream.
///
/// Positions are 64-bit offsets from the anchor: the sequence number after
/// the SYN, or the first data segment's sequence number when the SYN was
/// not captured. `pending` holds non-overlapping chunks strictly after the
/// delivered prefix.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    /// Sequence number of stream offset 0.
    anchor: Option<u32>,
    anchored_by_syn: bool,
    /// Length of the delivered prefix.
    delivered: u64,
    pending: BTreeMap<u64, Vec<u8>>,
    pending_bytes: usize,
    fin_offset: Option<u64>,
    stats: StreamStats,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor the stream on a SYN. A repeated SYN is ignored.
    pub fn set_initial_seq(&mut self, isn: u32) {
        if self.anchored_by_syn {
            return;
        }
        if self.anchor.is_none() {
            self.anchor = Some(isn.wrapping_add(1)); // SYN consumes one seq
            self.anchored_by_syn = true;
        }
    }

    /// Stream offset of `seq`, relative to the current delivery point.
    fn offset_of(&self, anchor: u32, seq: u32) -> i64 {
        let expected = anchor.wrapping_add(self.delivered as u32);
        self.delivered as i64 + seq.wrapping_sub(expected) as i32 as i64
    }

    /// Insert one segment's payload.
    ///
    /// Exact duplicates and data before the delivered prefix are dropped,
    /// overlaps are trimmed to their novel part, and a segment that would
    /// push the pending bytes past `max_buffered` is dropped whole.
    pub fn insert(
        &mut self,
        seq: u32,
        data: &[u8],
        max_buffered: usize,
        scratch: &mut Vec<u8>,
    ) -> Delivery {
        if data.is_empty() {
            return Delivery::Nothing;
        }
        self.stats.segments += 1;

        let anchor = *self.anchor.get_or_insert(seq);
        let start = self.offset_of(anchor, seq);
        let end = start + data.len() as i64;
        let delivered = self.delivered as i64;

        if end <= delivered {
            self.stats.duplicates += 1;
            return Delivery::Nothing;
        }

        let skip = if start < delivered {
            self.stats.overlaps_trimmed += 1;
            (delivered - start) as usize
        } else {
            0
        };
        let start = start.max(delivered) as u64;
        let data = &data[skip..];

        if start == self.delivered && self.pending.is_empty() {
            self.advance(data.len());
            return Delivery::Direct { offset: start, skip };
        }

        let pieces = match self.novel_pieces(start, data) {
            Some(pieces) => pieces,
            None => {
                self.stats.duplicates += 1;
                return Delivery::Nothing;
            }
        };

        if start > self.delivered {
            let novel: usize = pieces.iter().map(|(_, p)| p.len()).sum();
            if self.pending_bytes + novel > max_buffered {
                self.stats.overflow_drops += 1;
                warn!(
                    offset = start,
                    len = data.len(),
                    pending = self.pending_bytes,
                    max_buffered,
                    "reassembly buffer full, dropping segment"
                );
                return Delivery::Nothing;
            }
            self.stats.out_of_order += 1;
        }

        for (offset, piece) in pieces {
            self.pending_bytes += piece.len();
            self.pending.insert(offset, piece.to_vec());
        }

        if start == self.delivered {
            scratch.clear();
            self.drain_contiguous(scratch);
            Delivery::Assembled { offset: start }
        } else {
            Delivery::Nothing
        }
    }

    /// Split `[start, start + data.len())` around already-buffered chunks.
    /// Returns `None` when every byte is already buffered.
    fn novel_pieces<'d>(&mut self, start: u64, data: &'d [u8]) -> Option<Vec<(u64, &'d [u8])>> {
        let mut start = start;
        let mut data = data;
        let mut trimmed = false;

        // A chunk that begins at or before us may cover our front.
        if let Some((&prev, prev_data)) = self.pending.range(..=start).next_back() {
            let prev_end = prev + prev_data.len() as u64;
            if prev_end >= start + data.len() as u64 {
                return None;
            }
            if prev_end > start {
                data = &data[(prev_end - start) as usize..];
                start = prev_end;
                trimmed = true;
            }
        }

        let mut pieces = Vec::new();
        while !data.is_empty() {
            let end = start + data.len() as u64;
            let next = self
                .pending
                .range(start..end)
                .next()
                .map(|(&s, d)| (s, s + d.len() as u64));
            match next {
                None => {
                    pieces.push((start, data));
                    break;
                }
                Some((next_start, next_end)) => {
                    if next_start > start {
                        pieces.push((start, &data[..(next_start - start) as usize]));
                    }
                    trimmed = true;
                    if next_end >= end {
                        break;
                    }
                    data = &data[(next_end - start) as usize..];
                    start = next_end;
                }
            }
        }

        if pieces.is_empty() {
            return None;
        }
        if trimmed {
            self.stats.overlaps_trimmed += 1;
        }
        Some(pieces)
    }

    /// Move every chunk contiguous with the delivered prefix into `out`.
    fn drain_contiguous(&mut self, out: &mut Vec<u8>) {
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() != self.delivered {
                break;
            }
            let chunk = entry.remove();
            self.pending_bytes -= chunk.len();
            self.advance(chunk.len());
            out.extend_from_slice(&chunk);
        }
    }

    fn advance(&mut self, len: usize) {
        self.delivered += len as u64;
        self.stats.bytes_delivered += len as u64;
    }

    /// Record a FIN carried by a segment starting at `seq` with
    /// `payload_len` bytes of data.
    pub fn mark_fin(&mut self, seq: u32, payload_len: usize) {
        let anchor = *self.anchor.get_or_insert(seq);
        let end = self.offset_of(anchor, seq) + payload_len as i64;
        self.fin_offset = Some(end.max(0) as u64);
    }

    /// Drop everything still buffered, returning the byte count.
    pub fn discard_pending(&mut self) -> u64 {
        let discarded = self.pending_bytes as u64;
        self.pending.clear();
        self.pending_bytes = 0;
        self.stats.bytes_discarded += discarded;
        discarded
    }

    /// Length of the delivered prefix.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Bytes buffered behind a gap.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    pub fn fin_offset(&self) -> Option<u64> {
        self.fin_offset
    }

    /// FIN seen and everything before it delivered.
    pub fn is_complete(&self) -> bool {
        self.fin_offset.map_or(false, |fin| self.delivered >= fin)
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}
