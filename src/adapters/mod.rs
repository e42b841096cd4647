//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements  | Connects to               |
//! |---------------|-------------|---------------------------|
//! | `demo_source` | TopicSource | greeting text, wall clock |
//! | `log_sink`    | EventSink   | `log` facade              |
//! | `time`        | DelayNs     | system timer              |
//! | `udp`         | Transport   | UDP socket to the agent   |

pub mod demo_source;
pub mod log_sink;
pub mod time;
pub mod udp;
