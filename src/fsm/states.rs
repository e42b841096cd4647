//! Connection state handlers.
//!
//! ```text
//!   Disconnected ──▶ Probing ──▶ SessionEstablished ──▶ Provisioning ──▶ Connected
//!        ▲              │ ▲               │                   │              │
//!        │              └─┘ retry         │ fail              │ fail         │ keepalive
//!        ├────────────────────────────────┴───────────────────┘              ▼
//!        └──────────────────────────────────────────────────────────────  Closing
//! ```

use log::{error, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::{ReliableChannel, TopicSource};
use crate::error::Error;
use crate::protocol::dispatch::Dispatcher;
use crate::protocol::provisioning::provision;

use super::context::{Session, SessionContext};
use super::{StateDescriptor, StateId};

/// Build the state table.  Order must match `StateId` discriminants.
pub fn build_state_table<C: ReliableChannel, S: TopicSource>()
-> [StateDescriptor<SessionContext<C, S>>; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Disconnected,
            name: "Disconnected",
            on_enter: None,
            on_exit: None,
            on_update: disconnected_update,
        },
        StateDescriptor {
            id: StateId::Probing,
            name: "Probing",
            on_enter: None,
            on_exit: None,
            on_update: probing_update,
        },
        StateDescriptor {
            id: StateId::SessionEstablished,
            name: "SessionEstablished",
            on_enter: None,
            on_exit: None,
            on_update: session_update,
        },
        StateDescriptor {
            id: StateId::Provisioning,
            name: "Provisioning",
            on_enter: None,
            on_exit: None,
            on_update: provisioning_update,
        },
        StateDescriptor {
            id: StateId::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: None,
            on_update: connected_update,
        },
        StateDescriptor {
            id: StateId::Closing,
            name: "Closing",
            on_enter: Some(closing_enter),
            on_exit: None,
            on_update: closing_update,
        },
    ]
}

// ── Disconnected ──────────────────────────────────────────────

fn disconnected_update<C: ReliableChannel, S: TopicSource>(
    ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    if !ctx.transport_open {
        if let Err(e) = ctx.channel.open_transport() {
            ctx.record(e);
            if ctx.transport_ever_opened {
                warn!("transport reopen failed: {}, retrying", e);
            } else {
                error!("transport bring-up failed: {}", e);
                ctx.fatal = Some(e);
                ctx.notify(LinkEvent::Fatal(e));
            }
            return None;
        }
        ctx.transport_open = true;
        ctx.transport_ever_opened = true;
        info!("transport open, agent {}", ctx.config.agent_addr);
    }
    Some(StateId::Probing)
}

// ── Probing ───────────────────────────────────────────────────

fn probing_update<C: ReliableChannel, S: TopicSource>(
    ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    let attempts = ctx.config.ping_attempts;
    if ctx.channel.ping_agent(ctx.config.ping_timeout_ms, attempts) {
        info!("agent reachable");
        ctx.notify(LinkEvent::AgentReachable);
        Some(StateId::SessionEstablished)
    } else {
        warn!("agent not reachable after {} attempts, retrying", attempts);
        ctx.record(Error::LivenessTimeout);
        None
    }
}

// ── SessionEstablished ────────────────────────────────────────

fn session_update<C: ReliableChannel, S: TopicSource>(
    ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    let key = ctx.config.client_key;
    match ctx.channel.create_session(key) {
        Ok(streams) => {
            ctx.session = Some(Session {
                key,
                time_offset_ns: 0,
                streams,
            });
            info!("session 0x{:08x} created", key);
            ctx.notify(LinkEvent::SessionOpened { key });
            Some(StateId::Provisioning)
        }
        Err(e) => {
            warn!("session creation failed: {}", e);
            ctx.record(e);
            Some(StateId::Disconnected)
        }
    }
}

// ── Provisioning ──────────────────────────────────────────────

fn provisioning_update<C: ReliableChannel, S: TopicSource>(
    ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    let Some(streams) = ctx.session.map(|s| s.streams) else {
        return Some(StateId::Disconnected);
    };

    let mut inbound = Dispatcher::new(&ctx.routes, &mut ctx.buffers);
    let result = provision(&mut ctx.channel, &ctx.config, &ctx.registry, &streams, &mut inbound);

    match result {
        Ok(report) => ctx.notify(LinkEvent::Provisioned {
            entries: report.entries,
            data_requests: report.data_requests,
        }),
        Err(failure) => {
            ctx.record(failure.into());
            ctx.notify(LinkEvent::ProvisioningFailed(failure));
            // The transport stays up for the next probe.
            if ctx.session.take().is_some() {
                ctx.channel.delete_session();
            }
            return Some(StateId::Disconnected);
        }
    }

    ctx.time_sync.reset();
    refresh_time(ctx);
    Some(StateId::Connected)
}

// ── Connected ─────────────────────────────────────────────────

fn connected_enter<C: ReliableChannel, S: TopicSource>(ctx: &mut SessionContext<C, S>) {
    // Provisioning and sync traffic must not answer the first window.
    let _ = ctx.channel.take_liveness_reply();
    let now = ctx.channel.millis();
    ctx.keepalive.reset(now);
    ctx.channel.ping_session();
    ctx.publisher.reset();
    ctx.cycles += 1;
    info!("connected (cycle {})", ctx.cycles);
}

fn connected_update<C: ReliableChannel, S: TopicSource>(
    ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    let Some(streams) = ctx.session.map(|s| s.streams) else {
        return Some(StateId::Closing);
    };

    // 1. Time sync
    if ctx.time_sync.due(ctx.channel.epoch_millis()) {
        refresh_time(ctx);
    }

    // 2. Publish due entries
    ctx.publisher.run(
        Some(streams.reliable_out),
        &mut ctx.channel,
        &mut ctx.source,
        &ctx.registry,
        &mut ctx.buffers,
    );

    // 3. Pump inbound traffic
    let mut inbound = Dispatcher::new(&ctx.routes, &mut ctx.buffers);
    ctx.channel.run_session_time(ctx.config.spin_slice_ms, &mut inbound);

    // 4. Keepalive
    let reply = ctx.channel.take_liveness_reply();
    let step = ctx.keepalive.on_tick(ctx.channel.millis(), reply);
    if step.probe {
        ctx.channel.ping_session();
    }
    if step.exceeded {
        let misses = ctx.keepalive.misses();
        error!("agent lost: {} keepalive windows without reply", misses);
        ctx.record(Error::KeepaliveExceeded { misses });
        ctx.notify(LinkEvent::AgentLost { misses });
        return Some(StateId::Closing);
    }

    None
}

// ── Closing ───────────────────────────────────────────────────

fn closing_enter<C: ReliableChannel, S: TopicSource>(ctx: &mut SessionContext<C, S>) {
    ctx.cleanup();
}

fn closing_update<C: ReliableChannel, S: TopicSource>(
    _ctx: &mut SessionContext<C, S>,
) -> Option<StateId> {
    Some(StateId::Disconnected)
}

// ── Helpers ───────────────────────────────────────────────────

fn refresh_time<C: ReliableChannel, S: TopicSource>(ctx: &mut SessionContext<C, S>) {
    let mut inbound = Dispatcher::new(&ctx.routes, &mut ctx.buffers);
    let synced = ctx
        .time_sync
        .sync(&mut ctx.channel, ctx.config.request_timeout_ms, &mut inbound);
    if let Some(offset_ns) = synced {
        if let Some(session) = ctx.session.as_mut() {
            session.time_offset_ns = offset_ns;
        }
        ctx.notify(LinkEvent::TimeSynced { offset_ns });
    }
}
