#![no_main]

use dnp3_dissector::{Dissector, DissectorConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut dissector = Dissector::new(DissectorConfig::default(), |_event| {});
    let _ = dissector.feed(data);
    dissector.finish();
});
