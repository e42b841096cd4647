//! `std_msgs/String`.

use super::cdr::{CdrReader, CdrWriter};
use super::{MessageKind, TopicCodec};
use crate::error::CodecError;

/// Maximum payload length of a [`StringMsg`] in bytes (terminator excluded).
pub const STRING_CAPACITY: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMsg {
    pub data: heapless::String<STRING_CAPACITY>,
}

impl StringMsg {
    /// Build a message from `text`, truncating at a character boundary if it
    /// exceeds [`STRING_CAPACITY`].
    pub fn from_str_lossy(text: &str) -> Self {
        let mut msg = Self::default();
        msg.set_lossy(text);
        msg
    }

    /// Replace the contents with `text`, truncated to capacity.
    pub fn set_lossy(&mut self, text: &str) {
        self.data.clear();
        for ch in text.chars() {
            if self.data.push(ch).is_err() {
                break;
            }
        }
    }
}

impl TopicCodec for StringMsg {
    const KIND: MessageKind = MessageKind::String;

    fn size_of(&self) -> usize {
        4 + self.data.len() + 1
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = CdrWriter::new(buf);
        w.write_string(&self.data)?;
        Ok(w.position())
    }

    fn deserialize(buf: &[u8]) -> Result<Self, CodecError> {
        let mut r = CdrReader::new(buf);
        Ok(Self {
            data: r.read_string()?,
        })
    }
}
