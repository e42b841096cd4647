//! Periodic clock-offset refresh.

use log::{debug, warn};

use crate::app::ports::{InboundHandler, ReliableChannel};

/// Tracks when the offset was last refreshed on the agent-adjusted clock.
#[derive(Debug, Clone)]
pub struct TimeSync {
    interval_ms: i64,
    last_sync_ms: Option<i64>,
}

impl TimeSync {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: i64::from(interval_ms),
            last_sync_ms: None,
        }
    }

    /// Forget the last refresh so the next check is due immediately.
    pub fn reset(&mut self) {
        self.last_sync_ms = None;
    }

    pub fn due(&self, now_ms: i64) -> bool {
        match self.last_sync_ms {
            None => true,
            Some(last) => now_ms - last > self.interval_ms,
        }
    }

    pub fn last_sync_ms(&self) -> Option<i64> {
        self.last_sync_ms
    }

    /// Run one offset exchange.  The refresh is stamped whether or not it
    /// succeeded, so a failure is retried at the next interval only.
    pub fn sync(
        &mut self,
        channel: &mut impl ReliableChannel,
        timeout_ms: u32,
        inbound: &mut dyn InboundHandler,
    ) -> Option<i64> {
        let ok = channel.sync_session(timeout_ms, inbound);
        self.last_sync_ms = Some(channel.epoch_millis());
        if ok {
            let offset = channel.time_offset_ns();
            debug!("time synced, offset {} ns", offset);
            Some(offset)
        } else {
            warn!("time sync failed, next attempt in {} ms", self.interval_ms);
            None
        }
    }
}
