//! Host [`ReliableChannel`] over any [`Transport`].
//!
//! Every request is one postcard-encoded [`LinkMessage`] in a
//! length-prefixed frame.  Samples prepared with `prepare_output` sit in a
//! fixed output buffer (`mtu * stream_history` bytes) until the next pump
//! call flushes them.  All buffers are sized at compile time; nothing is
//! allocated after construction.  There is no retransmission: a lost status simply
//! times out and surfaces as `STATUS_NONE`.

use core::mem;

use log::{debug, warn};

use crate::adapters::time::SystemClock;
use crate::app::ports::{
    ClientKey, CreateRequest, CreationMode, DeliveryControl, InboundHandler, ReliableChannel,
    RequestId, SessionStreams, StreamId, INVALID_REQUEST_ID,
};
use crate::config::{ClientConfig, MAX_STREAM_BUFFER};
use crate::error::{Error, Result, TransportError};
use crate::protocol::status_ok;
use crate::registry::ObjectId;

use super::codec::{encode_frame, FrameDecoder, HEADER_SIZE, MAX_FRAME_SIZE};
use super::transport::Transport;
use super::wire::{EntitySpec, LinkMessage};

/// Id of the single reliable stream in each direction.
pub const RELIABLE_STREAM: StreamId = StreamId(0x80);

/// Outstanding statuses the channel keeps before dropping new ones.
const STATUS_TABLE_SIZE: usize = 64;

/// Samples queued between two flushes.
const MAX_QUEUED_SAMPLES: usize = 32;

/// Largest encoded frame, header included.
const FRAME_BUFFER_SIZE: usize = MAX_FRAME_SIZE + HEADER_SIZE;

// ---------------------------------------------------------------------------
// Inbound bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct TimeSample {
    originate_ns: i64,
    receive_ns: i64,
    transmit_ns: i64,
    arrival_ns: i64,
}

impl TimeSample {
    /// NTP-style offset: `((t2 - t1) + (t3 - t4)) / 2`.
    fn offset_ns(&self) -> i64 {
        ((self.receive_ns - self.originate_ns) + (self.transmit_ns - self.arrival_ns)) / 2
    }
}

#[derive(Default)]
struct LinkState {
    statuses: heapless::FnvIndexMap<RequestId, u8, STATUS_TABLE_SIZE>,
    session_status: Option<(ClientKey, u8)>,
    pong: Option<u32>,
    liveness_reply: bool,
    time_reply: Option<TimeSample>,
}

fn handle_frame(
    state: &mut LinkState,
    clock: &SystemClock,
    frame: &[u8],
    inbound: &mut dyn InboundHandler,
) {
    let msg = match postcard::from_bytes::<LinkMessage<'_>>(frame) {
        Ok(msg) => msg,
        Err(_) => {
            warn!("dropping malformed frame ({} bytes)", frame.len());
            return;
        }
    };

    // Any in-session answer proves the agent is alive.
    if matches!(
        msg,
        LinkMessage::Status { .. }
            | LinkMessage::Data { .. }
            | LinkMessage::TimeReply { .. }
            | LinkMessage::SessionPong
    ) {
        state.liveness_reply = true;
    }

    match msg {
        LinkMessage::Pong { nonce } => state.pong = Some(nonce),
        LinkMessage::SessionStatus { key, status } => state.session_status = Some((key, status)),
        LinkMessage::Status { request, status } => {
            if state.statuses.insert(request, status).is_err() {
                warn!("status table full, dropping status of request {}", request);
            }
        }
        LinkMessage::Data { reader, payload } => match ObjectId::from_raw(reader) {
            Some(reader) => inbound.on_topic(reader, payload),
            None => debug!("sample for malformed reader id 0x{:04x}", reader),
        },
        LinkMessage::TimeReply {
            originate_ns,
            receive_ns,
            transmit_ns,
        } => {
            state.time_reply = Some(TimeSample {
                originate_ns,
                receive_ns,
                transmit_ns,
                arrival_ns: clock.epoch_nanos(),
            });
        }
        LinkMessage::SessionPong => {}
        other => debug!("ignoring unexpected {:?}", other),
    }
}

/// Handler for pumps that run before any reader exists.
struct Discard;

impl InboundHandler for Discard {
    fn on_topic(&mut self, reader: ObjectId, _payload: &[u8]) {
        debug!("discarding early sample for 0x{:04x}", reader.raw());
    }
}

// ---------------------------------------------------------------------------
// Outbound framing and queued samples
// ---------------------------------------------------------------------------

struct Framer {
    payload: [u8; MAX_FRAME_SIZE],
    frame: [u8; FRAME_BUFFER_SIZE],
}

impl Framer {
    const fn new() -> Self {
        Self {
            payload: [0; MAX_FRAME_SIZE],
            frame: [0; FRAME_BUFFER_SIZE],
        }
    }

    fn send<T: Transport>(
        &mut self,
        transport: &mut T,
        msg: &LinkMessage<'_>,
    ) -> core::result::Result<(), TransportError> {
        let payload = postcard::to_slice(msg, &mut self.payload[..])
            .map_err(|_| TransportError::WriteFailed)?;
        let len = encode_frame(payload, &mut self.frame).ok_or(TransportError::WriteFailed)?;
        if transport.write(&self.frame[..len])? != len {
            return Err(TransportError::WriteFailed);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedSample {
    writer: u16,
    start: usize,
    len: usize,
}

struct OutputQueue {
    buf: [u8; MAX_STREAM_BUFFER],
    /// Usable prefix of `buf`.
    capacity: usize,
    used: usize,
    samples: heapless::Vec<QueuedSample, MAX_QUEUED_SAMPLES>,
}

impl OutputQueue {
    fn new(capacity: usize) -> Self {
        Self {
            buf: [0; MAX_STREAM_BUFFER],
            capacity: capacity.min(MAX_STREAM_BUFFER),
            used: 0,
            samples: heapless::Vec::new(),
        }
    }

    fn reserve(&mut self, writer: u16, len: usize) -> Option<&mut [u8]> {
        let start = self.used;
        let end = start.checked_add(len)?;
        if end > self.capacity || len > MAX_FRAME_SIZE / 2 {
            return None;
        }
        self.samples.push(QueuedSample { writer, start, len }).ok()?;
        self.used = end;
        Some(&mut self.buf[start..end])
    }

    fn clear(&mut self) {
        self.used = 0;
        self.samples.clear();
    }
}

// ---------------------------------------------------------------------------
// LinkChannel
// ---------------------------------------------------------------------------

pub struct LinkChannel<T: Transport> {
    transport: T,
    clock: SystemClock,
    framer: Framer,
    decoder: FrameDecoder,
    rx: [u8; FRAME_BUFFER_SIZE],
    state: LinkState,
    output: OutputQueue,
    request_timeout_ms: u32,
    next_request: RequestId,
    next_nonce: u32,
    session_key: Option<ClientKey>,
    offset_ns: i64,
}

impl<T: Transport> LinkChannel<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            clock: SystemClock::new(),
            framer: Framer::new(),
            decoder: FrameDecoder::new(),
            rx: [0; FRAME_BUFFER_SIZE],
            state: LinkState::default(),
            output: OutputQueue::new(config.stream_buffer_size()),
            request_timeout_ms: config.request_timeout_ms,
            next_request: INVALID_REQUEST_ID,
            next_nonce: 0,
            session_key: None,
            offset_ns: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Key of the live session, if any.
    pub fn session_key(&self) -> Option<ClientKey> {
        self.session_key
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request = self.next_request.wrapping_add(1);
        if self.next_request == INVALID_REQUEST_ID {
            self.next_request = 1;
        }
        self.next_request
    }

    fn send(&mut self, msg: &LinkMessage<'_>) -> core::result::Result<(), TransportError> {
        self.framer.send(&mut self.transport, msg)
    }

    fn flush_output(&mut self) -> core::result::Result<(), TransportError> {
        let mut result = Ok(());
        for sample in &self.output.samples {
            let payload = &self.output.buf[sample.start..sample.start + sample.len];
            let msg = LinkMessage::Write {
                writer: sample.writer,
                payload,
            };
            if let Err(e) = self.framer.send(&mut self.transport, &msg) {
                result = Err(e);
                break;
            }
        }
        self.output.clear();
        result
    }

    /// Read and dispatch frames until `done` holds or `timeout_ms` elapses.
    fn pump_until(
        &mut self,
        timeout_ms: u32,
        inbound: &mut dyn InboundHandler,
        done: impl Fn(&LinkState) -> bool,
    ) -> core::result::Result<bool, TransportError> {
        let deadline = self.clock.millis() + i64::from(timeout_ms);
        loop {
            if done(&self.state) {
                return Ok(true);
            }
            let now = self.clock.millis();
            if now >= deadline {
                return Ok(false);
            }
            let wait = u32::try_from(deadline - now).unwrap_or(u32::MAX);
            let n = self.transport.read(&mut self.rx, wait)?;

            let mut data = &self.rx[..n];
            while !data.is_empty() {
                let (used, frame) = self.decoder.feed(data);
                data = &data[used..];
                if let Some(frame) = frame {
                    handle_frame(&mut self.state, &self.clock, frame, inbound);
                }
            }
        }
    }
}

impl<T: Transport> ReliableChannel for LinkChannel<T> {
    fn open_transport(&mut self) -> Result<()> {
        self.transport.open()?;
        self.decoder.reset();
        Ok(())
    }

    fn close_transport(&mut self) {
        self.transport.close();
        self.decoder.reset();
        self.output.clear();
    }

    fn ping_agent(&mut self, timeout_ms: u32, attempts: u8) -> bool {
        for attempt in 1..=attempts {
            self.next_nonce = self.next_nonce.wrapping_add(1);
            let nonce = self.next_nonce;
            self.state.pong = None;

            let outcome = match self.send(&LinkMessage::Ping { nonce }) {
                Ok(()) => self.pump_until(timeout_ms, &mut Discard, |s| s.pong == Some(nonce)),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(true) => return true,
                Ok(false) => debug!("ping {}/{} timed out", attempt, attempts),
                Err(e) => {
                    debug!("ping {}/{} failed: {}", attempt, attempts, e);
                    std::thread::sleep(core::time::Duration::from_millis(u64::from(timeout_ms)));
                }
            }
        }
        false
    }

    fn create_session(&mut self, key: ClientKey) -> Result<SessionStreams> {
        self.state = LinkState::default();
        self.output.clear();
        self.send(&LinkMessage::CreateSession { key })?;

        let answered = self.pump_until(self.request_timeout_ms, &mut Discard, |s| {
            matches!(s.session_status, Some((k, _)) if k == key)
        })?;
        match self.state.session_status {
            Some((_, status)) if answered && status_ok(status) => {
                self.session_key = Some(key);
                self.offset_ns = 0;
                Ok(SessionStreams {
                    reliable_out: RELIABLE_STREAM,
                    reliable_in: RELIABLE_STREAM,
                })
            }
            Some((_, status)) => {
                warn!("agent refused session: status 0x{:02x}", status);
                Err(Error::SessionCreation)
            }
            None => Err(Error::SessionCreation),
        }
    }

    fn delete_session(&mut self) {
        if let Some(key) = self.session_key.take() {
            if let Err(e) = self.send(&LinkMessage::DeleteSession { key }) {
                debug!("delete session not sent: {}", e);
            }
        }
        self.output.clear();
        self.offset_ns = 0;
    }

    fn buffer_create(
        &mut self,
        stream: StreamId,
        request: &CreateRequest<'_>,
        mode: CreationMode,
    ) -> RequestId {
        let id = self.next_request_id();
        let msg = LinkMessage::Create {
            request: id,
            replace: mode == CreationMode::Replace,
            entity: EntitySpec::from(request),
        };
        if let Err(e) = self.send(&msg) {
            warn!("create request {} not sent: {}", id, e);
        }
        debug!(
            "request {}: create 0x{:04x} on stream 0x{:02x}",
            id,
            request.object_id().raw(),
            stream.0
        );
        id
    }

    fn buffer_request_data(
        &mut self,
        stream: StreamId,
        reader: ObjectId,
        input: StreamId,
        control: &DeliveryControl,
    ) -> RequestId {
        let id = self.next_request_id();
        let msg = LinkMessage::RequestData {
            request: id,
            reader: reader.raw(),
            max_samples: control.max_samples,
            max_elapsed_time: control.max_elapsed_time,
            max_bytes_per_second: control.max_bytes_per_second,
            min_pace_period: control.min_pace_period,
        };
        if let Err(e) = self.send(&msg) {
            warn!("data request {} not sent: {}", id, e);
        }
        debug!(
            "request {}: data for 0x{:04x} on 0x{:02x} -> 0x{:02x}",
            id,
            reader.raw(),
            stream.0,
            input.0
        );
        id
    }

    fn run_until_all_status(
        &mut self,
        timeout_ms: u32,
        requests: &[RequestId],
        statuses: &mut [u8],
        inbound: &mut dyn InboundHandler,
    ) -> bool {
        if let Err(e) = self.flush_output() {
            warn!("output flush failed: {}", e);
        }
        if let Err(e) = self.pump_until(timeout_ms, inbound, |s| {
            requests.iter().all(|r| s.statuses.contains_key(r))
        }) {
            warn!("status wait failed: {}", e);
        }

        let mut all_ok = true;
        for (slot, request) in statuses.iter_mut().zip(requests) {
            match self.state.statuses.remove(request) {
                Some(status) => {
                    *slot = status;
                    all_ok &= status_ok(status);
                }
                None => all_ok = false,
            }
        }
        all_ok && statuses.len() >= requests.len()
    }

    fn sync_session(&mut self, timeout_ms: u32, inbound: &mut dyn InboundHandler) -> bool {
        let originate_ns = self.clock.epoch_nanos();
        self.state.time_reply = None;
        if let Err(e) = self.send(&LinkMessage::TimeRequest { originate_ns }) {
            warn!("time request not sent: {}", e);
            return false;
        }

        let answered = self.pump_until(timeout_ms, inbound, |s| {
            matches!(s.time_reply, Some(r) if r.originate_ns == originate_ns)
        });
        match answered {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("time sync read failed: {}", e);
                return false;
            }
        }
        match self.state.time_reply.take() {
            Some(sample) => {
                self.offset_ns = sample.offset_ns();
                true
            }
            None => false,
        }
    }

    fn time_offset_ns(&self) -> i64 {
        self.offset_ns
    }

    fn ping_session(&mut self) {
        if self.session_key.is_none() {
            return;
        }
        if let Err(e) = self.send(&LinkMessage::SessionPing) {
            debug!("session ping not sent: {}", e);
        }
    }

    fn take_liveness_reply(&mut self) -> bool {
        mem::take(&mut self.state.liveness_reply)
    }

    fn prepare_output(
        &mut self,
        _stream: StreamId,
        writer: ObjectId,
        size: usize,
    ) -> Option<&mut [u8]> {
        self.session_key?;
        self.output.reserve(writer.raw(), size)
    }

    fn run_session_time(&mut self, timeout_ms: u32, inbound: &mut dyn InboundHandler) -> bool {
        if let Err(e) = self.flush_output() {
            warn!("output flush failed: {}", e);
            return false;
        }
        match self.pump_until(timeout_ms, inbound, |_| false) {
            Ok(_) => true,
            Err(e) => {
                warn!("session pump failed: {}", e);
                false
            }
        }
    }

    fn millis(&self) -> i64 {
        self.clock.millis()
    }

    fn epoch_nanos(&self) -> i64 {
        self.clock.epoch_nanos() + self.offset_ns
    }
}
