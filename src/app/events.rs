//! Outbound lifecycle events.
//!
//! State handlers queue these on the session context; the
//! [`ClientService`](super::service::ClientService) drains them into the
//! [`EventSink`](super::ports::EventSink) port after every tick.

use crate::error::{Error, ProvisioningFailure};
use crate::fsm::StateId;

/// Structured events emitted by the connection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The agent answered the liveness probe.
    AgentReachable,

    /// A session was created.
    SessionOpened { key: u32 },

    /// Every registry entry was created on the agent.
    Provisioned { entries: usize, data_requests: usize },

    /// Provisioning aborted on the first failing request.
    ProvisioningFailed(ProvisioningFailure),

    /// The clock offset was refreshed.
    TimeSynced { offset_ns: i64 },

    /// The keepalive monitor declared the agent unreachable.
    AgentLost { misses: u8 },

    /// An unrecoverable error stopped the service.
    Fatal(Error),
}
