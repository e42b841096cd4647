//! xrcelink client library.
//!
//! A reconnecting DDS-XRCE style client core: transport bring-up, liveness
//! probing, session establishment, table-driven entity provisioning,
//! keepalive supervision, time sync, and topic publish/dispatch.  Target
//! specific code is guarded by `#[cfg(target_os = "espidf")]` inside each
//! module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod link;
pub mod messages;
pub mod protocol;
pub mod registry;
