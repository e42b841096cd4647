//! Control messages exchanged with a link agent, postcard-encoded inside
//! length-prefixed frames.

use serde::{Deserialize, Serialize};

use crate::app::ports::CreateRequest;
use crate::registry::Qos;

/// Entity description carried by [`LinkMessage::Create`].  Object ids are
/// raw (`id << 4 | kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitySpec<'a> {
    Participant {
        id: u16,
        domain_id: u16,
        name: &'a str,
    },
    Topic {
        id: u16,
        participant: u16,
        name: &'a str,
        type_name: &'a str,
    },
    Publisher {
        id: u16,
        participant: u16,
    },
    Subscriber {
        id: u16,
        participant: u16,
    },
    DataWriter {
        id: u16,
        publisher: u16,
        topic: u16,
        qos: Qos,
    },
    DataReader {
        id: u16,
        subscriber: u16,
        topic: u16,
        qos: Qos,
    },
}

impl<'a> From<&CreateRequest<'a>> for EntitySpec<'a> {
    fn from(request: &CreateRequest<'a>) -> Self {
        match *request {
            CreateRequest::Participant {
                id,
                domain_id,
                name,
            } => Self::Participant {
                id: id.raw(),
                domain_id,
                name,
            },
            CreateRequest::Topic {
                id,
                participant,
                name,
                type_name,
            } => Self::Topic {
                id: id.raw(),
                participant: participant.raw(),
                name,
                type_name,
            },
            CreateRequest::Publisher { id, participant } => Self::Publisher {
                id: id.raw(),
                participant: participant.raw(),
            },
            CreateRequest::Subscriber { id, participant } => Self::Subscriber {
                id: id.raw(),
                participant: participant.raw(),
            },
            CreateRequest::DataWriter {
                id,
                publisher,
                topic,
                qos,
            } => Self::DataWriter {
                id: id.raw(),
                publisher: publisher.raw(),
                topic: topic.raw(),
                qos,
            },
            CreateRequest::DataReader {
                id,
                subscriber,
                topic,
                qos,
            } => Self::DataReader {
                id: id.raw(),
                subscriber: subscriber.raw(),
                topic: topic.raw(),
                qos,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMessage<'a> {
    // ── Client → agent ────────────────────────────────────────
    /// Sessionless liveness probe.
    Ping { nonce: u32 },
    CreateSession { key: u32 },
    DeleteSession { key: u32 },
    Create {
        request: u16,
        replace: bool,
        #[serde(borrow)]
        entity: EntitySpec<'a>,
    },
    /// Standing data request.  A zero limit is disabled.
    RequestData {
        request: u16,
        reader: u16,
        max_samples: u16,
        max_elapsed_time: u16,
        max_bytes_per_second: u16,
        min_pace_period: u16,
    },
    /// Sample written by a data writer.
    Write { writer: u16, payload: &'a [u8] },
    TimeRequest { originate_ns: i64 },
    /// In-session liveness probe.
    SessionPing,

    // ── Agent → client ────────────────────────────────────────
    Pong { nonce: u32 },
    SessionStatus { key: u32, status: u8 },
    Status { request: u16, status: u8 },
    /// Sample delivered to a data reader.
    Data { reader: u16, payload: &'a [u8] },
    TimeReply {
        originate_ns: i64,
        receive_ns: i64,
        transmit_ns: i64,
    },
    SessionPong,
}
