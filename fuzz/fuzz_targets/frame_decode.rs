//! Fuzz target for Frame::decode
//!
//! Feeds arbitrary text to the codec to find:
//! - Panics on short or empty input
//! - Slicing at non-UTF-8 boundaries after the digit prefix
//! - Prefix dispatch that accepts malformed ack digits
//!
//! The fuzzer should NEVER panic. Unknown prefixes return `Ok(None)`, bad JSON
//! after a known prefix returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomwire_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Should never panic, only return Err for malformed payloads
    let _ = Frame::decode(text);
});
