//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌────────────────────┬──────────┬─────────┬───────────────────┐ │
//! │  │ StateId            │ on_enter │ on_exit │ on_update         │ │
//! │  ├────────────────────┼──────────┼─────────┼───────────────────┤ │
//! │  │ Disconnected       │    -     │    -    │ fn(ctx)->Option<> │ │
//! │  │ Probing            │    -     │    -    │ fn(ctx)->Option<> │ │
//! │  │ SessionEstablished │    -     │    -    │ fn(ctx)->Option<> │ │
//! │  │ Provisioning       │    -     │    -    │ fn(ctx)->Option<> │ │
//! │  │ Connected          │ fn(ctx)  │    -    │ fn(ctx)->Option<> │ │
//! │  │ Closing            │ fn(ctx)  │    -    │ fn(ctx)->Option<> │ │
//! │  └────────────────────┴──────────┴─────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  The engine is generic over the context type `X`
//! so its mechanics can be tested without a channel.

pub mod context;
pub mod states;

use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Connection lifecycle states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Disconnected = 0,
    Probing = 1,
    SessionEstablished = 2,
    Provisioning = 3,
    Connected = 4,
    Closing = 5,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `StateId`.  Out-of-range indices assert in
    /// debug builds and fall back to `Disconnected`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::Probing,
            2 => Self::SessionEstablished,
            3 => Self::Provisioning,
            4 => Self::Connected,
            5 => Self::Closing,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disconnected
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<X> = fn(&mut X);

/// Per-tick update handler.  `Some(next)` triggers a transition.
pub type StateUpdateFn<X> = fn(&mut X) -> Option<StateId>;

/// One row in the state table.
pub struct StateDescriptor<X> {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<X>>,
    pub on_exit: Option<StateActionFn<X>>,
    pub on_update: StateUpdateFn<X>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm<X> {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor<X>; StateId::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl<X> Fsm<X> {
    pub fn new(table: [StateDescriptor<X>; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut X) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut X) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Jump to `next` regardless of what `on_update` returns.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut X) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut X) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
