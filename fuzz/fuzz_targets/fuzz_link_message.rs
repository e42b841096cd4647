//! Fuzz target: `LinkMessage` decoding
//!
//! Agent frames arrive from the network; decoding any byte string must
//! fail cleanly or produce a message that survives a re-encode.
//!
//! cargo fuzz run fuzz_link_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use xrcelink::link::wire::LinkMessage;

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = postcard::from_bytes::<LinkMessage<'_>>(data) else {
        return;
    };
    let bytes = postcard::to_allocvec(&msg).expect("decoded message must re-encode");
    let again: LinkMessage<'_> = postcard::from_bytes(&bytes).expect("re-encoded message must decode");
    assert_eq!(again, msg);
});
