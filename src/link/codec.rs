//! Length-prefix frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ Length (4B)│ postcard payload (N B)   │
//! │ LE u32     │                          │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames.  A
//! single `Transport::read` may return part of the header, part of the
//! payload, or several frames back to back; [`FrameDecoder::feed`] reports
//! how much it consumed so the caller can keep feeding the rest.

/// Maximum frame payload size.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Frame header size (4-byte little-endian length).
pub const HEADER_SIZE: usize = 4;

enum DecoderState {
    ReadingHeader { collected: usize },
    ReadingPayload { expected: usize, collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: [u8; MAX_FRAME_SIZE],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload_buf: [0; MAX_FRAME_SIZE],
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns the number of bytes consumed and, when a frame completed, its
    /// payload.  The payload is valid until the next call to `feed`.  A
    /// zero or oversized length header is skipped.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<&[u8]>) {
        let mut offset = 0;

        while offset < data.len() {
            match &mut self.state {
                DecoderState::ReadingHeader { collected } => {
                    let to_copy = (HEADER_SIZE - *collected).min(data.len() - offset);
                    self.header_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == HEADER_SIZE {
                        let expected = u32::from_le_bytes(self.header_buf) as usize;
                        self.state = if expected == 0 || expected > MAX_FRAME_SIZE {
                            DecoderState::ReadingHeader { collected: 0 }
                        } else {
                            DecoderState::ReadingPayload {
                                expected,
                                collected: 0,
                            }
                        };
                    }
                }

                DecoderState::ReadingPayload { expected, collected } => {
                    let to_copy = (*expected - *collected).min(data.len() - offset);
                    self.payload_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                        return (offset, Some(&self.payload_buf[..len]));
                    }
                }
            }
        }

        (offset, None)
    }

    /// Drop any partial frame (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
    }
}

/// Write `[LE-u32 length][payload]` into `out_buf`, returning the total
/// length, or `None` if it does not fit.
pub fn encode_frame(payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let total = HEADER_SIZE + payload.len();
    if payload.is_empty() || payload.len() > MAX_FRAME_SIZE || total > out_buf.len() {
        return None;
    }

    out_buf[..HEADER_SIZE].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out_buf[HEADER_SIZE..total].copy_from_slice(payload);
    Some(total)
}
