//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per lifecycle
//! event to the `log` facade (env_logger on the host, the ESP-IDF logger on
//! device).

use log::{error, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Started(state) => info!("START | initial_state={:?}", state),
            LinkEvent::StateChanged { from, to } => info!("STATE | {:?} -> {:?}", from, to),
            LinkEvent::AgentReachable => info!("AGENT | reachable"),
            LinkEvent::SessionOpened { key } => info!("SESSION | opened key=0x{:08x}", key),
            LinkEvent::Provisioned {
                entries,
                data_requests,
            } => info!(
                "PROVISION | ok entries={} data_requests={}",
                entries, data_requests
            ),
            LinkEvent::ProvisioningFailed(failure) => warn!("PROVISION | failed: {}", failure),
            LinkEvent::TimeSynced { offset_ns } => info!("TIME | offset={}ns", offset_ns),
            LinkEvent::AgentLost { misses } => warn!("AGENT | lost after {} misses", misses),
            LinkEvent::Fatal(e) => error!("FATAL | {}", e),
        }
    }
}
