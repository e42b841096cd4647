//! Scripted reliable channel for integration tests.
//!
//! Records every port call in order so tests can assert on the full
//! request history, answers with scripted statuses and runs on a manual
//! clock that only moves when a test (or a session pump) advances it.

use std::collections::{HashMap, VecDeque};

use xrcelink::app::events::LinkEvent;
use xrcelink::app::ports::{
    ClientKey, CreateRequest, CreationMode, DeliveryControl, EventSink, InboundHandler,
    ReliableChannel, RequestId, SessionStreams, StreamId,
};
use xrcelink::error::{Error, Result, TransportError};
use xrcelink::protocol::{STATUS_OK, status_ok};
use xrcelink::registry::ObjectId;

pub const STREAMS: SessionStreams = SessionStreams {
    reliable_out: StreamId(0x80),
    reliable_in: StreamId(0x80),
};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    OpenTransport,
    CloseTransport,
    PingAgent,
    CreateSession(ClientKey),
    DeleteSession,
    Create {
        request: RequestId,
        entity: ObjectId,
        replace: bool,
    },
    RequestData {
        request: RequestId,
        reader: ObjectId,
        control: DeliveryControl,
    },
    /// `run_until_all_status` with this many correlated requests.
    WaitStatus(usize),
    SyncSession,
    PingSession,
}

// ── MockChannel ───────────────────────────────────────────────

pub struct MockChannel {
    pub calls: Vec<Call>,

    // -- Script --
    /// Upcoming `open_transport` calls that fail.
    pub fail_opens: usize,
    /// Result of `ping_agent`.
    pub agent_up: bool,
    /// Upcoming `create_session` calls the agent refuses.
    pub session_refusals: usize,
    /// `(n, status)`: the n-th create of the next session answers `status`.
    pub create_failure: Option<(usize, u8)>,
    /// Whether session pings get a reply.
    pub answer_session_pings: bool,
    pub sync_ok: bool,
    /// Offset reported by a successful time sync.
    pub agent_offset_ns: i64,
    /// Samples delivered on the next session pump.
    pub inbound: VecDeque<(ObjectId, Vec<u8>)>,

    // -- Clock --
    pub now_ms: i64,
    pub epoch_base_ms: i64,

    // -- Output --
    pub written: Vec<(ObjectId, Vec<u8>)>,

    session: Option<ClientKey>,
    next_request: RequestId,
    creates_in_session: usize,
    statuses: HashMap<RequestId, u8>,
    liveness_reply: bool,
    offset_ns: i64,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_opens: 0,
            agent_up: true,
            session_refusals: 0,
            create_failure: None,
            answer_session_pings: true,
            sync_ok: true,
            agent_offset_ns: 0,
            inbound: VecDeque::new(),
            now_ms: 10_000,
            epoch_base_ms: 1_700_000_000_000,
            written: Vec::new(),
            session: None,
            next_request: 0,
            creates_in_session: 0,
            statuses: HashMap::new(),
            liveness_reply: false,
            offset_ns: 0,
        }
    }

    pub fn advance(&mut self, ms: i64) {
        self.now_ms += ms;
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Entities created, in request order.
    pub fn created(&self) -> Vec<ObjectId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Create { entity, .. } => Some(*entity),
                _ => None,
            })
            .collect()
    }

    /// Readers with a standing data request, in request order.
    pub fn data_requests(&self) -> Vec<ObjectId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::RequestData { reader, .. } => Some(*reader),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    pub fn rposition(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().rposition(pred)
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request = self.next_request.wrapping_add(1).max(1);
        self.next_request
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliableChannel for MockChannel {
    fn open_transport(&mut self) -> Result<()> {
        self.calls.push(Call::OpenTransport);
        if self.fail_opens > 0 {
            self.fail_opens -= 1;
            return Err(Error::Transport(TransportError::OpenFailed));
        }
        Ok(())
    }

    fn close_transport(&mut self) {
        self.calls.push(Call::CloseTransport);
    }

    fn ping_agent(&mut self, _timeout_ms: u32, _attempts: u8) -> bool {
        self.calls.push(Call::PingAgent);
        self.agent_up
    }

    fn create_session(&mut self, key: ClientKey) -> Result<SessionStreams> {
        self.calls.push(Call::CreateSession(key));
        if self.session_refusals > 0 {
            self.session_refusals -= 1;
            return Err(Error::SessionCreation);
        }
        self.session = Some(key);
        self.creates_in_session = 0;
        self.statuses.clear();
        Ok(STREAMS)
    }

    fn delete_session(&mut self) {
        self.calls.push(Call::DeleteSession);
        self.session = None;
        self.liveness_reply = false;
    }

    fn buffer_create(
        &mut self,
        _stream: StreamId,
        request: &CreateRequest<'_>,
        mode: CreationMode,
    ) -> RequestId {
        let id = self.next_request_id();
        self.calls.push(Call::Create {
            request: id,
            entity: request.object_id(),
            replace: mode == CreationMode::Replace,
        });

        let status = match self.create_failure {
            Some((n, status)) if n == self.creates_in_session => {
                self.create_failure = None;
                status
            }
            _ => STATUS_OK,
        };
        self.statuses.insert(id, status);
        self.creates_in_session += 1;
        id
    }

    fn buffer_request_data(
        &mut self,
        _stream: StreamId,
        reader: ObjectId,
        _input: StreamId,
        control: &DeliveryControl,
    ) -> RequestId {
        let id = self.next_request_id();
        self.calls.push(Call::RequestData {
            request: id,
            reader,
            control: *control,
        });
        id
    }

    fn run_until_all_status(
        &mut self,
        _timeout_ms: u32,
        requests: &[RequestId],
        statuses: &mut [u8],
        _inbound: &mut dyn InboundHandler,
    ) -> bool {
        self.calls.push(Call::WaitStatus(requests.len()));
        let mut all_ok = true;
        // Statuses are in-session traffic, like on the real link.
        if self.session.is_some() && requests.iter().any(|r| self.statuses.contains_key(r)) {
            self.liveness_reply = true;
        }
        for (slot, request) in statuses.iter_mut().zip(requests) {
            match self.statuses.remove(request) {
                Some(status) => {
                    *slot = status;
                    all_ok &= status_ok(status);
                }
                None => all_ok = false,
            }
        }
        all_ok
    }

    fn sync_session(&mut self, _timeout_ms: u32, _inbound: &mut dyn InboundHandler) -> bool {
        self.calls.push(Call::SyncSession);
        if self.sync_ok {
            self.offset_ns = self.agent_offset_ns;
            self.liveness_reply |= self.session.is_some();
        }
        self.sync_ok
    }

    fn time_offset_ns(&self) -> i64 {
        self.offset_ns
    }

    fn ping_session(&mut self) {
        self.calls.push(Call::PingSession);
        if self.session.is_some() && self.answer_session_pings {
            self.liveness_reply = true;
        }
    }

    fn take_liveness_reply(&mut self) -> bool {
        std::mem::take(&mut self.liveness_reply)
    }

    fn prepare_output(
        &mut self,
        _stream: StreamId,
        writer: ObjectId,
        size: usize,
    ) -> Option<&mut [u8]> {
        self.session?;
        self.written.push((writer, vec![0; size]));
        self.written.last_mut().map(|(_, buf)| buf.as_mut_slice())
    }

    fn run_session_time(&mut self, timeout_ms: u32, inbound: &mut dyn InboundHandler) -> bool {
        while let Some((reader, payload)) = self.inbound.pop_front() {
            inbound.on_topic(reader, &payload);
        }
        self.now_ms += i64::from(timeout_ms);
        true
    }

    fn millis(&self) -> i64 {
        self.now_ms
    }

    fn epoch_nanos(&self) -> i64 {
        (self.epoch_base_ms + self.now_ms) * 1_000_000 + self.offset_ns
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<LinkEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pred: impl Fn(&LinkEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LinkEvent) {
        self.events.push(*event);
    }
}
