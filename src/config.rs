//! Client configuration parameters
//!
//! All tunable parameters of the xrcelink client.  Values come from a JSON
//! file at load time (see [`ClientConfig::from_json`]) or fall back to the
//! defaults below, which mirror a stock micro-ROS agent setup.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV: &str = "XRCELINK_CONFIG";

/// Static capacity of the reliable output stream buffer.
pub const MAX_STREAM_BUFFER: usize = 16 * 1024;

/// Core client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // --- Identity ---
    /// Client key presented to the agent when creating the session
    pub client_key: u32,
    /// Numeric id of the DDS participant created on the agent
    pub participant_id: u16,
    /// Participant name
    pub participant_name: heapless::String<64>,
    /// DDS domain id
    pub domain_id: u16,
    /// Namespace inserted into every ROS topic name (may be empty)
    pub topic_namespace: heapless::String<32>,

    // --- Transport ---
    /// Agent address, `host:port`
    pub agent_addr: heapless::String<64>,
    /// Local bind address, `host:port`
    pub bind_addr: heapless::String<64>,
    /// Largest frame the transport carries (bytes)
    pub mtu: u16,
    /// Reliable stream history depth (frames)
    pub stream_history: u16,

    // --- Requests ---
    /// Timeout for each provisioning status wait and time-sync round trip (ms)
    pub request_timeout_ms: u32,
    /// Timeout of one liveness probe attempt (ms)
    pub ping_timeout_ms: u32,
    /// Probe attempts per probing step
    pub ping_attempts: u8,

    // --- Keepalive ---
    /// Interval between session pings while connected (ms)
    pub keepalive_interval_ms: u32,
    /// Missed windows tolerated before the session is dropped
    pub keepalive_max_misses: u8,

    // --- Timing ---
    /// Clock-offset refresh interval (ms, agent clock)
    pub time_sync_interval_ms: u32,
    /// Time slice handed to the channel pump each tick (ms)
    pub spin_slice_ms: u32,
    /// Sleep between loop ticks (µs)
    pub tick_interval_us: u32,

    // --- Topics ---
    /// Publish period of the talker topic (ms)
    pub talker_period_ms: u32,
    /// Text published on the talker topic
    pub greeting: heapless::String<64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Identity
            client_key: 0xAAAA_BBBB,
            participant_id: 0x01,
            participant_name: bounded("microxrcedds_participant"),
            domain_id: 0,
            topic_namespace: bounded("xrcelink"),

            // Transport
            agent_addr: bounded("127.0.0.1:8888"),
            bind_addr: bounded("0.0.0.0:0"),
            mtu: 512,
            stream_history: 20,

            // Requests
            request_timeout_ms: 500,
            ping_timeout_ms: 1000,
            ping_attempts: 10,

            // Keepalive
            keepalive_interval_ms: 500,
            keepalive_max_misses: 2,

            // Timing
            time_sync_interval_ms: 60_000, // 1/min
            spin_slice_ms: 1,
            tick_interval_us: 100,

            // Topics
            talker_period_ms: 1000, // 1 Hz
            greeting: bounded("Hello from xrcelink!"),
        }
    }
}

impl ClientConfig {
    /// Parse a (possibly partial) JSON document over the defaults and
    /// validate the result.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed configuration JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the connection loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.agent_addr.is_empty() {
            return Err(Error::Config("agent_addr is empty"));
        }
        if self.participant_name.is_empty() {
            return Err(Error::Config("participant_name is empty"));
        }
        if self.mtu < 64 {
            return Err(Error::Config("mtu below 64 bytes"));
        }
        if self.stream_history == 0 {
            return Err(Error::Config("stream_history is zero"));
        }
        if self.stream_buffer_size() > MAX_STREAM_BUFFER {
            return Err(Error::Config("mtu * stream_history exceeds the stream buffer"));
        }
        if self.request_timeout_ms == 0 || self.ping_timeout_ms == 0 {
            return Err(Error::Config("request and ping timeouts must be non-zero"));
        }
        if self.ping_attempts == 0 {
            return Err(Error::Config("ping_attempts is zero"));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(Error::Config("keepalive_interval_ms is zero"));
        }
        if self.spin_slice_ms >= self.keepalive_interval_ms {
            return Err(Error::Config("spin slice must be shorter than the keepalive interval"));
        }
        if self.time_sync_interval_ms <= self.keepalive_interval_ms {
            return Err(Error::Config("time sync interval must exceed the keepalive interval"));
        }
        if self.talker_period_ms == 0 {
            return Err(Error::Config("talker_period_ms is zero"));
        }
        Ok(())
    }

    /// Bytes reserved for each reliable stream (`mtu * stream_history`).
    pub fn stream_buffer_size(&self) -> usize {
        usize::from(self.mtu) * usize::from(self.stream_history)
    }
}

/// Copy `text` into a fixed-capacity string, truncating at a character
/// boundary when it does not fit.
pub(crate) fn bounded<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
