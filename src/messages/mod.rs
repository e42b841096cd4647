//! Topic message types and their per-type codecs.
//!
//! Each message type implements [`TopicCodec`], the `size_of` / `serialize`
//! / `deserialize` triple the publisher and dispatcher are written against.
//! [`TopicValue`] is the tagged union stored in the fixed topic buffers, so
//! selecting a codec for a registry entry is a `match`, not a pointer cast.

pub mod builtin_interfaces;
pub mod cdr;
pub mod std_msgs;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

pub use builtin_interfaces::TimeMsg;
pub use std_msgs::StringMsg;

/// Per-type codec boundary.
pub trait TopicCodec: Sized {
    /// Which [`MessageKind`] this codec handles.
    const KIND: MessageKind;

    /// Exact number of bytes [`serialize`](Self::serialize) will write.
    fn size_of(&self) -> usize;

    /// Encode into `buf`, returning the number of bytes written.
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError>;

    /// Decode a complete payload.
    fn deserialize(buf: &[u8]) -> Result<Self, CodecError>;
}

/// Message types a registry entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// `std_msgs/String`
    String,
    /// `builtin_interfaces/Time`
    Time,
}

impl MessageKind {
    /// ROS 2 package and type name, e.g. `("std_msgs", "String")`.
    pub const fn ros_name(self) -> (&'static str, &'static str) {
        match self {
            Self::String => ("std_msgs", "String"),
            Self::Time => ("builtin_interfaces", "Time"),
        }
    }
}

/// The value held in one topic buffer slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicValue {
    String(StringMsg),
    Time(TimeMsg),
}

impl TopicValue {
    /// Zero value for a slot of the given kind.
    pub fn empty(kind: MessageKind) -> Self {
        match kind {
            MessageKind::String => Self::String(StringMsg::default()),
            MessageKind::Time => Self::Time(TimeMsg::default()),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::String(_) => MessageKind::String,
            Self::Time(_) => MessageKind::Time,
        }
    }

    pub fn size_of(&self) -> usize {
        match self {
            Self::String(m) => m.size_of(),
            Self::Time(m) => m.size_of(),
        }
    }

    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            Self::String(m) => m.serialize(buf),
            Self::Time(m) => m.serialize(buf),
        }
    }

    /// Decode `buf` with the codec selected by `kind`.
    pub fn deserialize(kind: MessageKind, buf: &[u8]) -> Result<Self, CodecError> {
        match kind {
            MessageKind::String => StringMsg::deserialize(buf).map(Self::String),
            MessageKind::Time => TimeMsg::deserialize(buf).map(Self::Time),
        }
    }
}
