//! Property and fuzz-style tests for the codecs and the keepalive monitor.
//!
//! Runs on host only; proptest is not available for ESP32 targets.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use xrcelink::link::codec::{FrameDecoder, HEADER_SIZE, MAX_FRAME_SIZE, encode_frame};
use xrcelink::messages::std_msgs::STRING_CAPACITY;
use xrcelink::messages::{MessageKind, StringMsg, TimeMsg, TopicCodec, TopicValue};
use xrcelink::protocol::keepalive::KeepaliveMonitor;

// ── Topic payload codecs ──────────────────────────────────────

proptest! {
    /// Any string within the bound decodes back to itself.
    #[test]
    fn string_msg_survives_cdr(text in "[ -~]{0,255}") {
        let msg = StringMsg::from_str_lossy(&text);

        let mut buf = vec![0u8; msg.size_of()];
        let written = msg.serialize(&mut buf).unwrap();
        prop_assert_eq!(written, msg.size_of());

        let decoded = StringMsg::deserialize(&buf[..written]).unwrap();
        prop_assert_eq!(decoded.data.as_str(), text.as_str());
    }

    /// Oversized input is truncated to the bound, never rejected.
    #[test]
    fn string_msg_truncates_to_capacity(len in 0usize..600) {
        let text = "x".repeat(len);
        let msg = StringMsg::from_str_lossy(&text);
        prop_assert_eq!(msg.data.len(), len.min(STRING_CAPACITY));
    }

    #[test]
    fn time_msg_survives_cdr(sec in any::<i32>(), nanosec in 0u32..1_000_000_000) {
        let value = TopicValue::Time(TimeMsg { sec, nanosec });
        let mut buf = [0u8; 16];
        let n = value.serialize(&mut buf).unwrap();
        prop_assert_eq!(TopicValue::deserialize(MessageKind::Time, &buf[..n]).unwrap(), value);
    }

    /// Decoding garbage yields an error or a value, never a panic.
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
        let _ = TopicValue::deserialize(MessageKind::String, &bytes);
        let _ = TopicValue::deserialize(MessageKind::Time, &bytes);
    }
}

// ── Frame codec ───────────────────────────────────────────────

proptest! {
    /// Back-to-back frames split at arbitrary points come out intact and in
    /// order.
    #[test]
    fn frames_survive_arbitrary_splits(
        payloads in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..64), 1..6),
        chunk in 1usize..32,
    ) {
        let mut stream = Vec::new();
        for p in &payloads {
            let mut frame = vec![0u8; HEADER_SIZE + p.len()];
            let n = encode_frame(p, &mut frame).unwrap();
            stream.extend_from_slice(&frame[..n]);
        }

        let mut decoder = FrameDecoder::new();
        let mut out: Vec<Vec<u8>> = Vec::new();
        for piece in stream.chunks(chunk) {
            let mut data = piece;
            while !data.is_empty() {
                let (used, frame) = decoder.feed(data);
                if let Some(frame) = frame {
                    out.push(frame.to_vec());
                }
                data = &data[used..];
            }
        }
        prop_assert_eq!(out, payloads);
    }

    #[test]
    fn decoder_never_yields_oversized_frames(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut decoder = FrameDecoder::new();
        let mut data = bytes.as_slice();
        while !data.is_empty() {
            let (used, frame) = decoder.feed(data);
            if let Some(frame) = frame {
                prop_assert!(!frame.is_empty());
                prop_assert!(frame.len() <= MAX_FRAME_SIZE);
            }
            prop_assert!(used > 0);
            data = &data[used..];
        }
    }
}

// ── Keepalive ─────────────────────────────────────────────────

proptest! {
    /// The monitor only trips after more than `max_misses` silent windows,
    /// and any reply in a window resets the count.
    #[test]
    fn keepalive_trips_only_past_the_limit(
        replies in proptest::collection::vec(any::<bool>(), 1..20),
        max_misses in 0u8..4,
    ) {
        let mut k = KeepaliveMonitor::new(500, max_misses);
        k.reset(0);
        let mut silent = 0u8;
        for (i, reply) in replies.iter().enumerate() {
            let now = (i as i64 + 1) * 501;
            let step = k.on_tick(now, *reply);
            silent = if *reply { 0 } else { silent + 1 };
            prop_assert!(step.probe);
            prop_assert_eq!(k.misses(), silent);
            prop_assert_eq!(step.exceeded, silent > max_misses);
        }
    }
}
