//! Client service: the hexagonal core.
//!
//! [`ClientService`] owns the FSM and the session context.  All I/O flows
//! through the port traits it is generic over, so the whole connection
//! lifecycle runs against a scripted channel in tests.
//!
//! ```text
//!  ReliableChannel ◀─▶ ┌────────────────────────┐ ──▶ EventSink
//!                      │     ClientService       │
//!  TopicSource ──────▶ │  FSM · protocol state   │
//!                      └────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{error, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::fsm::context::{Session, SessionContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::protocol::dispatch::TopicBuffers;
use crate::protocol::keepalive::KeepaliveMonitor;
use crate::registry::TopicRegistry;

use super::events::LinkEvent;
use super::ports::{EventSink, ReliableChannel, TopicSource};

// ───────────────────────────────────────────────────────────────
// ClientService
// ───────────────────────────────────────────────────────────────

pub struct ClientService<C: ReliableChannel, S: TopicSource> {
    fsm: Fsm<SessionContext<C, S>>,
    ctx: SessionContext<C, S>,
}

impl<C: ReliableChannel, S: TopicSource> ClientService<C, S> {
    /// Validate the configuration and assemble the service.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) or
    /// [`run`](Self::run) next.
    pub fn new(config: ClientConfig, registry: TopicRegistry, channel: C, source: S) -> Result<Self> {
        config.validate()?;
        let ctx = SessionContext::new(config, registry, channel, source)?;
        let fsm = Fsm::new(build_state_table(), StateId::Disconnected);
        Ok(Self { fsm, ctx })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&LinkEvent::Started(self.fsm.current_state()));
        info!("ClientService started in {:?}", self.fsm.current_state());
    }

    /// Run one state-machine step.  Returns the fatal error once the
    /// service cannot continue.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let prev_state = self.fsm.current_state();

        self.fsm.tick(&mut self.ctx);

        while let Some(event) = self.ctx.next_event() {
            sink.emit(&event);
        }

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&LinkEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        match self.ctx.fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Start and tick forever, sleeping `tick_interval_us` between ticks.
    ///
    /// Only returns on an unrecoverable error, after releasing resources.
    pub fn run(&mut self, delay: &mut impl DelayNs, sink: &mut impl EventSink) -> Error {
        self.start(sink);
        let pause_us = self.ctx.config.tick_interval_us;
        loop {
            if let Err(e) = self.tick(sink) {
                error!("client stopped: {}", e);
                self.shutdown();
                return e;
            }
            delay.delay_us(pause_us);
        }
    }

    /// Release session and transport.  Idempotent.
    pub fn shutdown(&mut self) {
        self.ctx.cleanup();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn tick_count(&self) -> u64 {
        self.fsm.tick_count()
    }

    pub fn session(&self) -> Option<&Session> {
        self.ctx.session.as_ref()
    }

    pub fn buffers(&self) -> &TopicBuffers {
        &self.ctx.buffers
    }

    pub fn keepalive(&self) -> &KeepaliveMonitor {
        &self.ctx.keepalive
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.ctx.registry
    }

    pub fn last_error(&self) -> Option<Error> {
        self.ctx.last_error
    }

    /// Completed entries into `Connected`.
    pub fn cycles(&self) -> u32 {
        self.ctx.cycles
    }

    pub fn channel(&self) -> &C {
        &self.ctx.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.ctx.channel
    }
}
