//! `builtin_interfaces/Time`.

use super::cdr::{CdrReader, CdrWriter};
use super::{MessageKind, TopicCodec};
use crate::error::CodecError;

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeMsg {
    pub sec: i32,
    pub nanosec: u32,
}

impl TimeMsg {
    /// Split an epoch timestamp in nanoseconds into seconds and nanoseconds.
    pub fn from_epoch_nanos(nanos: i64) -> Self {
        Self {
            sec: nanos.div_euclid(NANOS_PER_SEC) as i32,
            nanosec: nanos.rem_euclid(NANOS_PER_SEC) as u32,
        }
    }
}

impl TopicCodec for TimeMsg {
    const KIND: MessageKind = MessageKind::Time;

    fn size_of(&self) -> usize {
        8
    }

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = CdrWriter::new(buf);
        w.write_i32(self.sec)?;
        w.write_u32(self.nanosec)?;
        Ok(w.position())
    }

    fn deserialize(buf: &[u8]) -> Result<Self, CodecError> {
        let mut r = CdrReader::new(buf);
        let sec = r.read_i32()?;
        let nanosec = r.read_u32()?;
        if i64::from(nanosec) >= NANOS_PER_SEC {
            return Err(CodecError::BoundExceeded);
        }
        Ok(Self { sec, nanosec })
    }
}
