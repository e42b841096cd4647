//! Application core: connection lifecycle orchestration, zero direct I/O.
//!
//! All interaction with the agent, the clock and the application happens
//! through the **port traits** in [`ports`], keeping this layer testable
//! with a scripted channel.

pub mod events;
pub mod ports;
pub mod service;
