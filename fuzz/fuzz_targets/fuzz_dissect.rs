//! Fuzz target for the dissection chain.
//!
//! Every frame passes through the parsers for each root link type. Layers
//! must stay inside the frame whether dissection succeeds or not.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcapstream_core::packet::LinkType;
use pcapstream_core::protocol::{default_registry, dissect};
use smallvec::SmallVec;

fuzz_target!(|data: &[u8]| {
    let registry = default_registry();

    for link_type in [LinkType::ETHERNET, LinkType::LINUX_SLL, LinkType::RAW, LinkType::NULL] {
        let mut layers = SmallVec::new();
        let _ = dissect(&registry, link_type, data, &mut layers);
        for layer in &layers {
            assert!(layer.end() <= data.len());
        }
    }
});
