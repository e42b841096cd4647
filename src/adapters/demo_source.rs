//! Default topic source: a fixed greeting for string topics and the
//! agent-adjusted wall clock for time topics.

use crate::app::ports::TopicSource;
use crate::messages::{TimeMsg, TopicValue};
use crate::registry::EndpointDescriptor;

pub struct DemoSource {
    greeting: heapless::String<64>,
}

impl DemoSource {
    pub fn new(greeting: &str) -> Self {
        Self {
            greeting: crate::config::bounded(greeting),
        }
    }
}

impl TopicSource for DemoSource {
    fn update(&mut self, _entry: &EndpointDescriptor, value: &mut TopicValue, epoch_nanos: i64) {
        match value {
            TopicValue::String(msg) => msg.set_lossy(&self.greeting),
            TopicValue::Time(t) => *t = TimeMsg::from_epoch_nanos(epoch_nanos),
        }
    }
}
