//! Inbound demultiplexing and the per-entry topic buffers.

use log::{debug, info, warn};

use crate::app::ports::InboundHandler;
use crate::error::RegistryError;
use crate::messages::TopicValue;
use crate::registry::{ObjectId, TopicRegistry, MAX_TOPICS};

/// One value slot per registry entry, indexed like the registry.
#[derive(Debug, Clone)]
pub struct TopicBuffers {
    slots: heapless::Vec<TopicValue, MAX_TOPICS>,
}

impl TopicBuffers {
    pub fn new(registry: &TopicRegistry) -> Self {
        let mut slots = heapless::Vec::new();
        for entry in registry.iter() {
            // The registry never exceeds MAX_TOPICS entries.
            let _ = slots.push(TopicValue::empty(entry.message));
        }
        Self { slots }
    }

    pub fn get(&self, index: usize) -> Option<&TopicValue> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TopicValue> {
        self.slots.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Data-reader id (raw) → registry index.
#[derive(Debug, Clone)]
pub struct RouteTable {
    map: heapless::FnvIndexMap<u16, usize, MAX_TOPICS>,
}

impl RouteTable {
    pub fn new(registry: &TopicRegistry) -> Result<Self, RegistryError> {
        let mut map = heapless::FnvIndexMap::new();
        for (index, entry) in registry.subscribers() {
            map.insert(entry.data_entity_id.raw(), index)
                .map_err(|_| RegistryError::Full)?;
        }
        Ok(Self { map })
    }

    pub fn lookup(&self, reader: ObjectId) -> Option<usize> {
        self.map.get(&reader.raw()).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// [`InboundHandler`] that decodes samples into their topic buffer slot.
///
/// Never blocks and never touches the channel.
pub struct Dispatcher<'a> {
    routes: &'a RouteTable,
    buffers: &'a mut TopicBuffers,
    delivered: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn new(routes: &'a RouteTable, buffers: &'a mut TopicBuffers) -> Self {
        Self {
            routes,
            buffers,
            delivered: 0,
        }
    }

    /// Samples decoded into a slot so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl InboundHandler for Dispatcher<'_> {
    fn on_topic(&mut self, reader: ObjectId, payload: &[u8]) {
        let Some(index) = self.routes.lookup(reader) else {
            debug!("ignoring sample for unknown reader 0x{:04x}", reader.raw());
            return;
        };
        let Some(slot) = self.buffers.get_mut(index) else {
            return;
        };

        match TopicValue::deserialize(slot.kind(), payload) {
            Ok(value) => {
                if let TopicValue::String(msg) = &value {
                    info!("I heard: {}", msg.data);
                }
                *slot = value;
                self.delivered += 1;
            }
            Err(e) => warn!("entry {}: dropped undecodable sample ({})", index, e),
        }
    }
}
