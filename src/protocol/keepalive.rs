//! Keepalive miss counting.
//!
//! Every `interval_ms` the monitor closes a window: a window that saw a
//! reply resets the miss counter, one that did not increments it.  Each
//! closed window asks the caller to send a fresh probe.  The peer is
//! declared unreachable once misses exceed `max_misses`.

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepaliveStep {
    /// Send a non-blocking session ping now.
    pub probe: bool,
    /// Too many consecutive windows without a reply.
    pub exceeded: bool,
}

#[derive(Debug, Clone)]
pub struct KeepaliveMonitor {
    interval_ms: i64,
    max_misses: u8,
    last_probe_ms: i64,
    had_reply: bool,
    misses: u8,
}

impl KeepaliveMonitor {
    pub fn new(interval_ms: u32, max_misses: u8) -> Self {
        Self {
            interval_ms: i64::from(interval_ms),
            max_misses,
            last_probe_ms: 0,
            had_reply: false,
            misses: 0,
        }
    }

    /// Start a fresh first window at `now_ms`.
    pub fn reset(&mut self, now_ms: i64) {
        self.last_probe_ms = now_ms;
        self.had_reply = false;
        self.misses = 0;
    }

    pub fn on_tick(&mut self, now_ms: i64, reply_seen: bool) -> KeepaliveStep {
        self.had_reply |= reply_seen;

        let mut probe = false;
        if now_ms - self.last_probe_ms > self.interval_ms {
            if self.had_reply {
                self.misses = 0;
            } else {
                self.misses = self.misses.saturating_add(1);
            }
            self.had_reply = false;
            self.last_probe_ms = now_ms;
            probe = true;
        }

        KeepaliveStep {
            probe,
            exceeded: self.misses > self.max_misses,
        }
    }

    pub fn misses(&self) -> u8 {
        self.misses
    }

    pub fn last_probe_ms(&self) -> i64 {
        self.last_probe_ms
    }

    pub fn had_reply(&self) -> bool {
        self.had_reply
    }
}
