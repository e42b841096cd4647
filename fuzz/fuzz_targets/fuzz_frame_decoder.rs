//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder and
//! asserts that it never panics, always makes progress, never yields an
//! empty or oversized payload, and accepts the same bytes again after a
//! reset.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use xrcelink::link::codec::{FrameDecoder, MAX_FRAME_SIZE};

fn drain(decoder: &mut FrameDecoder, mut data: &[u8]) -> usize {
    let mut frames = 0;
    while !data.is_empty() {
        let (used, frame) = decoder.feed(data);
        if let Some(payload) = frame {
            assert!(!payload.is_empty(), "decoder must not yield empty payload");
            assert!(payload.len() <= MAX_FRAME_SIZE, "payload exceeds MAX_FRAME_SIZE");
            frames += 1;
        }
        assert!(used > 0 && used <= data.len(), "feed must make progress");
        data = &data[used..];
    }
    frames
}

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let first = drain(&mut decoder, data);

    // A fresh start over the same bytes sees the same frames.
    decoder.reset();
    assert_eq!(drain(&mut decoder, data), first);
});
