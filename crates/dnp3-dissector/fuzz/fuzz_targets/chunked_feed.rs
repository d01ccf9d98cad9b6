#![no_main]

use dnp3_dissector::{Dissector, DissectorConfig};
use libfuzzer_sys::fuzz_target;

/// Feeds the same arbitrary input in small, irregular chunks with a tiny
/// `ctxmax`, to stress chunk-boundary handling and LRU eviction together.
fuzz_target!(|data: &[u8]| {
    let mut dissector = Dissector::new(DissectorConfig { ctxmax: 2, buflen: 64 }, |_event| {});
    for chunk in data.chunks(3) {
        let _ = dissector.feed(chunk);
    }
    dissector.finish();
});
