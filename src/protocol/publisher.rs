//! Interval-gated publishing of registry publisher entries.

use log::{debug, warn};

use crate::app::ports::{ReliableChannel, StreamId, TopicSource};
use crate::registry::{TopicRegistry, MAX_TOPICS};

use super::dispatch::TopicBuffers;

/// Scratch space for one serialized sample.
pub const SCRATCH_SIZE: usize = 512;

pub struct PublisherLoop {
    last_publish: [Option<i64>; MAX_TOPICS],
    scratch: [u8; SCRATCH_SIZE],
}

impl Default for PublisherLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl PublisherLoop {
    pub fn new() -> Self {
        Self {
            last_publish: [None; MAX_TOPICS],
            scratch: [0; SCRATCH_SIZE],
        }
    }

    /// Make every entry due again (first publish after connecting is immediate).
    pub fn reset(&mut self) {
        self.last_publish = [None; MAX_TOPICS];
    }

    /// Epoch milliseconds of the last publish attempt of entry `index`.
    pub fn last_publish(&self, index: usize) -> Option<i64> {
        self.last_publish.get(index).copied().flatten()
    }

    /// Publish every due entry on `output`.  `None` (no session) is a no-op.
    ///
    /// Returns the number of samples handed to the channel.
    pub fn run(
        &mut self,
        output: Option<StreamId>,
        channel: &mut impl ReliableChannel,
        source: &mut impl TopicSource,
        registry: &TopicRegistry,
        buffers: &mut TopicBuffers,
    ) -> usize {
        let Some(stream) = output else {
            return 0;
        };

        let mut pushed = 0;
        for (index, entry) in registry.publishers() {
            let Some(period) = entry.period_ms else {
                continue;
            };
            let now = channel.epoch_millis();
            if let Some(last) = self.last_publish[index] {
                if now - last <= i64::from(period) {
                    continue;
                }
            }
            // The clock advances even if this attempt fails below.
            self.last_publish[index] = Some(now);

            let Some(value) = buffers.get_mut(index) else {
                continue;
            };
            source.update(entry, value, channel.epoch_nanos());

            let len = match value.serialize(&mut self.scratch) {
                Ok(len) => len,
                Err(e) => {
                    warn!("entry {} '{}': serialize failed ({})", index, entry.topic_name, e);
                    continue;
                }
            };

            match channel.prepare_output(stream, entry.data_entity_id, len) {
                Some(slot) if slot.len() >= len => {
                    slot[..len].copy_from_slice(&self.scratch[..len]);
                    debug!("entry {} '{}': queued {} bytes", index, entry.topic_name, len);
                    pushed += 1;
                }
                _ => warn!(
                    "entry {} '{}': no room for {} bytes on output stream",
                    index, entry.topic_name, len
                ),
            }
        }
        pushed
    }
}
