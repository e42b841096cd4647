//! xrcelink: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                    │
//! │  UdpTransport   LogEventSink   DemoSource   ThreadDelay    │
//! │  ─────────────── Port Trait Boundary ──────────────────    │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  ClientService (worker thread)                       │  │
//! │  │  FSM · provisioning · keepalive · time sync · topics │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use log::info;

use xrcelink::adapters::demo_source::DemoSource;
use xrcelink::adapters::log_sink::LogEventSink;
use xrcelink::adapters::time::ThreadDelay;
use xrcelink::adapters::udp::UdpTransport;
use xrcelink::app::service::ClientService;
use xrcelink::config::{CONFIG_ENV, ClientConfig};
use xrcelink::error::Error;
use xrcelink::link::channel::LinkChannel;
use xrcelink::registry::TopicRegistry;

/// Stack of the worker thread running the connection loop.  The link
/// channel keeps its frame and stream buffers inline.
const WORKER_STACK_SIZE: usize = 96 * 1024;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("xrcelink v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration and topic table ──────────────────────
    let config = load_config()?;
    let registry = TopicRegistry::standard(&config).map_err(Error::from)?;
    info!(
        "agent {} | client key 0x{:08x} | {} topics",
        config.agent_addr,
        config.client_key,
        registry.len()
    );

    // ── 3. Adapters and connection loop on a dedicated worker ──
    // Built on the worker so the inline buffers live on its stack.
    let worker = std::thread::Builder::new()
        .name("xrcelink".into())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            let transport = UdpTransport::new(&config.agent_addr, &config.bind_addr);
            let channel = LinkChannel::new(transport, &config);
            let source = DemoSource::new(&config.greeting);
            let mut service = match ClientService::new(config, registry, channel, source) {
                Ok(service) => service,
                Err(err) => return err,
            };
            let mut sink = LogEventSink::new();
            service.run(&mut ThreadDelay, &mut sink)
        })
        .context("spawning client thread")?;

    let err = worker
        .join()
        .map_err(|_| anyhow!("client thread panicked"))?;
    Err(anyhow::Error::new(err).context("client stopped"))
}

/// Load the JSON file named by `XRCELINK_CONFIG`, or fall back to defaults.
fn load_config() -> Result<ClientConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        info!("{} not set, using default configuration", CONFIG_ENV);
        return Ok(ClientConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = ClientConfig::from_json(&text).with_context(|| format!("parsing {path}"))?;
    info!("configuration loaded from {}", path);
    Ok(config)
}
