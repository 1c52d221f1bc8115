//! Fuzz target for TCP stream reassembly.
//!
//! The input is cut into segments of (seq offset, length) pairs over a
//! fixed byte range. Whatever order they arrive in, delivered bytes must be
//! a prefix of the original stream and never repeat.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapstream_core::stream::{Delivery, StreamBuffer};

const STREAM_LEN: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let original: Vec<u8> = (0..STREAM_LEN).map(|i| (i * 7 % 251) as u8).collect();
    let isn = data
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(0);

    let mut buffer = StreamBuffer::new();
    buffer.set_initial_seq(isn);
    let mut scratch = Vec::new();
    let mut delivered = Vec::new();

    for chunk in data.get(4..).unwrap_or(&[]).chunks(4) {
        if chunk.len() < 4 {
            break;
        }
        let start = u16::from_le_bytes([chunk[0], chunk[1]]) as usize % STREAM_LEN;
        let len = (u16::from_le_bytes([chunk[2], chunk[3]]) as usize % 512).min(STREAM_LEN - start);
        let seq = isn.wrapping_add(1).wrapping_add(start as u32);
        let payload = &original[start..start + len];

        match buffer.insert(seq, payload, 1 << 20, &mut scratch) {
            Delivery::Nothing => {}
            Delivery::Direct { offset, skip } => {
                assert_eq!(offset as usize, delivered.len());
                delivered.extend_from_slice(&payload[skip..]);
            }
            Delivery::Assembled { offset } => {
                assert_eq!(offset as usize, delivered.len());
                delivered.extend_from_slice(&scratch);
            }
        }
        assert_eq!(buffer.delivered() as usize, delivered.len());
    }

    assert_eq!(&original[..delivered.len()], &delivered[..]);
});
