//! Fuzz target for capture file parsing.
//!
//! Covers magic detection, legacy and pcapng headers, record lengths and
//! timestamp resolution, through the same reader the dispatcher uses.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapstream_core::io::GenericPcapReader;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut reader) = GenericPcapReader::new(Cursor::new(data)) {
        let _ = reader.dispatch_frames(|frame| {
            assert!(frame.data.len() <= data.len());
        });
    }
});
