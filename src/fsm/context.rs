//! Shared mutable context threaded through every FSM handler.
//!
//! `SessionContext` is the blackboard the state handlers read from and
//! write to: configuration, the topic table, the channel, the session
//! handle, protocol monitors and topic buffers.  Only state handlers open
//! or close the transport and create or delete the session.

use log::info;

use crate::app::events::LinkEvent;
use crate::app::ports::{ClientKey, ReliableChannel, SessionStreams, TopicSource};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::dispatch::{RouteTable, TopicBuffers};
use crate::protocol::keepalive::KeepaliveMonitor;
use crate::protocol::publisher::PublisherLoop;
use crate::protocol::time_sync::TimeSync;
use crate::registry::TopicRegistry;

/// Queued events not yet drained by the service.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// The live session.  At most one exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub key: ClientKey,
    /// Latest estimated offset of the agent clock (ns).
    pub time_offset_ns: i64,
    pub streams: SessionStreams,
}

pub struct SessionContext<C, S> {
    // -- Configuration --
    pub config: ClientConfig,
    pub registry: TopicRegistry,

    // -- Collaborators --
    pub channel: C,
    pub source: S,

    // -- Connection --
    pub session: Option<Session>,
    pub transport_open: bool,
    /// Set once the transport has opened at least once.
    pub transport_ever_opened: bool,
    /// Completed entries into `Connected`.
    pub cycles: u32,

    // -- Errors --
    /// Unrecoverable error; the service stops once this is set.
    pub fatal: Option<Error>,
    /// Most recent error of any kind.
    pub last_error: Option<Error>,

    // -- Protocol state --
    pub routes: RouteTable,
    pub buffers: TopicBuffers,
    pub keepalive: KeepaliveMonitor,
    pub time_sync: TimeSync,
    pub publisher: PublisherLoop,

    events: heapless::Deque<LinkEvent, EVENT_QUEUE_DEPTH>,
}

impl<C: ReliableChannel, S: TopicSource> SessionContext<C, S> {
    pub fn new(config: ClientConfig, registry: TopicRegistry, channel: C, source: S) -> Result<Self> {
        let routes = RouteTable::new(&registry)?;
        let buffers = TopicBuffers::new(&registry);
        let keepalive = KeepaliveMonitor::new(config.keepalive_interval_ms, config.keepalive_max_misses);
        let time_sync = TimeSync::new(config.time_sync_interval_ms);
        Ok(Self {
            config,
            registry,
            channel,
            source,
            session: None,
            transport_open: false,
            transport_ever_opened: false,
            cycles: 0,
            fatal: None,
            last_error: None,
            routes,
            buffers,
            keepalive,
            time_sync,
            publisher: PublisherLoop::new(),
            events: heapless::Deque::new(),
        })
    }

    /// Release the session and the transport.  Idempotent.
    pub fn cleanup(&mut self) {
        if let Some(session) = self.session.take() {
            self.channel.delete_session();
            info!("session 0x{:08x} deleted", session.key);
        }
        if self.transport_open {
            self.channel.close_transport();
            self.transport_open = false;
            info!("transport closed");
        }
    }

    /// Record a non-fatal error.
    pub fn record(&mut self, err: Error) {
        self.last_error = Some(err);
    }

    /// Queue an event for the service; the oldest is dropped when full.
    pub fn notify(&mut self, event: LinkEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        let _ = self.events.push_back(event);
    }

    pub fn next_event(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }
}
