//! Fuzz target: topic payload decoding
//!
//! Feeds arbitrary bytes to the CDR decoders of every message kind.  A
//! payload that decodes must re-encode to a value that decodes back to
//! itself.
//!
//! cargo fuzz run fuzz_topic_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use xrcelink::messages::{MessageKind, TopicValue};

fuzz_target!(|data: &[u8]| {
    for kind in [MessageKind::String, MessageKind::Time] {
        let Ok(value) = TopicValue::deserialize(kind, data) else {
            continue;
        };
        assert_eq!(value.kind(), kind);

        let mut buf = vec![0u8; value.size_of()];
        let n = value.serialize(&mut buf).expect("decoded value must re-encode");
        assert_eq!(n, value.size_of());
        assert_eq!(TopicValue::deserialize(kind, &buf[..n]).ok(), Some(value));
    }
});
