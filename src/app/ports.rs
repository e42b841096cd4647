//! Port traits: the hexagonal boundary between the connection engine and
//! the outside world.
//!
//! ```text
//!   LinkChannel / mock ──▶ ReliableChannel ──▶ ClientService (domain)
//!   DemoSource         ──▶ TopicSource     ──▶
//!                          EventSink       ◀── lifecycle events
//! ```
//!
//! The [`ClientService`](super::service::ClientService) consumes these via
//! generics, so the engine never touches a socket or a clock directly.

use crate::error::Result;
use crate::messages::TopicValue;
use crate::registry::{EndpointDescriptor, ObjectId, Qos};

/// Agent-assigned correlation id of a buffered request.  `0` is never valid.
pub type RequestId = u16;

/// Key identifying this client to the agent.
pub type ClientKey = u32;

/// Request id returned when a request could not even be buffered.
pub const INVALID_REQUEST_ID: RequestId = 0;

// ───────────────────────────────────────────────────────────────
// Session streams
// ───────────────────────────────────────────────────────────────

/// Stream identifier inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u8);

/// The two reliable streams every session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStreams {
    pub reliable_out: StreamId,
    pub reliable_in: StreamId,
}

// ───────────────────────────────────────────────────────────────
// Entity creation
// ───────────────────────────────────────────────────────────────

/// What to do when the agent already holds an entity with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    /// Delete and recreate.
    Replace,
    /// Keep the existing entity and report `OK_MATCHED`.
    Reuse,
}

/// One entity-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRequest<'a> {
    Participant {
        id: ObjectId,
        domain_id: u16,
        name: &'a str,
    },
    Topic {
        id: ObjectId,
        participant: ObjectId,
        name: &'a str,
        type_name: &'a str,
    },
    Publisher {
        id: ObjectId,
        participant: ObjectId,
    },
    Subscriber {
        id: ObjectId,
        participant: ObjectId,
    },
    DataWriter {
        id: ObjectId,
        publisher: ObjectId,
        topic: ObjectId,
        qos: Qos,
    },
    DataReader {
        id: ObjectId,
        subscriber: ObjectId,
        topic: ObjectId,
        qos: Qos,
    },
}

impl CreateRequest<'_> {
    /// Id of the entity this request creates.
    pub fn object_id(&self) -> ObjectId {
        match *self {
            Self::Participant { id, .. }
            | Self::Topic { id, .. }
            | Self::Publisher { id, .. }
            | Self::Subscriber { id, .. }
            | Self::DataWriter { id, .. }
            | Self::DataReader { id, .. } => id,
        }
    }
}

/// Delivery control of a standing data request.  Zero disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryControl {
    pub max_samples: u16,
    pub max_elapsed_time: u16,
    pub max_bytes_per_second: u16,
    pub min_pace_period: u16,
}

impl DeliveryControl {
    /// `max_samples` value meaning "no limit".
    pub const UNLIMITED_SAMPLES: u16 = 0xFFFF;

    /// Unlimited samples, optionally throttled to `rate_limit` bytes/s.
    /// Registry tables never carry a limit above `u16::MAX`; anything
    /// larger passed here saturates.
    pub fn for_rate_limit(rate_limit: Option<u32>) -> Self {
        let max_bytes_per_second = rate_limit
            .map(|r| u16::try_from(r).unwrap_or(u16::MAX))
            .unwrap_or(0);
        Self {
            max_samples: Self::UNLIMITED_SAMPLES,
            max_elapsed_time: 0,
            max_bytes_per_second,
            min_pace_period: 0,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Reliable channel port (driven adapter: engine ↔ agent)
// ───────────────────────────────────────────────────────────────

/// Session-oriented reliable channel to the agent.
///
/// Blocking calls take an explicit timeout and an [`InboundHandler`] that
/// receives any topic samples arriving while the call pumps the transport.
pub trait ReliableChannel {
    /// Bring up the byte transport.
    fn open_transport(&mut self) -> Result<()>;

    /// Tear down the byte transport.  Safe to call when already closed.
    fn close_transport(&mut self);

    /// Probe agent liveness: `attempts` tries of `timeout_ms` each.
    fn ping_agent(&mut self, timeout_ms: u32, attempts: u8) -> bool;

    /// Create a session keyed by `key`, returning its reliable streams.
    fn create_session(&mut self, key: ClientKey) -> Result<SessionStreams>;

    /// Delete the current session.  Safe to call without one.
    fn delete_session(&mut self);

    /// Buffer an entity-creation request on `stream`.
    fn buffer_create(
        &mut self,
        stream: StreamId,
        request: &CreateRequest<'_>,
        mode: CreationMode,
    ) -> RequestId;

    /// Buffer a standing data request for `reader`, delivered on `input`.
    fn buffer_request_data(
        &mut self,
        stream: StreamId,
        reader: ObjectId,
        input: StreamId,
        control: &DeliveryControl,
    ) -> RequestId;

    /// Flush buffered requests and wait until every id in `requests` has a
    /// status or `timeout_ms` elapses.  `statuses[i]` receives the status of
    /// `requests[i]` (untouched when none arrived).  Returns `true` only when
    /// all statuses arrived and all are successes.
    fn run_until_all_status(
        &mut self,
        timeout_ms: u32,
        requests: &[RequestId],
        statuses: &mut [u8],
        inbound: &mut dyn InboundHandler,
    ) -> bool;

    /// One bounded clock-offset exchange with the agent.
    fn sync_session(&mut self, timeout_ms: u32, inbound: &mut dyn InboundHandler) -> bool;

    /// Latest estimated offset of the agent clock (ns).
    fn time_offset_ns(&self) -> i64;

    /// Non-blocking in-session liveness probe.
    fn ping_session(&mut self);

    /// Whether the agent answered a session probe, or sent any other
    /// in-session traffic, since the last call.
    fn take_liveness_reply(&mut self) -> bool;

    /// Reserve `size` bytes on `stream` for a sample written by `writer`.
    fn prepare_output(
        &mut self,
        stream: StreamId,
        writer: ObjectId,
        size: usize,
    ) -> Option<&mut [u8]>;

    /// Flush output and pump inbound traffic for `timeout_ms`.
    fn run_session_time(&mut self, timeout_ms: u32, inbound: &mut dyn InboundHandler) -> bool;

    /// Local monotonic clock (ms).
    fn millis(&self) -> i64;

    /// Agent-adjusted epoch time (ns).
    fn epoch_nanos(&self) -> i64;

    /// Agent-adjusted epoch time (ms).
    fn epoch_millis(&self) -> i64 {
        self.epoch_nanos().div_euclid(1_000_000)
    }
}

/// Receives topic samples demultiplexed by data-reader id.
pub trait InboundHandler {
    fn on_topic(&mut self, reader: ObjectId, payload: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Topic source port (driven adapter: application → engine)
// ───────────────────────────────────────────────────────────────

/// Supplies the next value of a publisher entry.
pub trait TopicSource {
    /// Update `value` in place before it is serialized and pushed.
    fn update(&mut self, entry: &EndpointDescriptor, value: &mut TopicValue, epoch_nanos: i64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: engine → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`LinkEvent`](super::events::LinkEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::LinkEvent);
}
