//! Table-driven entity provisioning.
//!
//! ```text
//!   participant ──wait──▶ [topic, role, data entity] ──wait──▶ ... per entry
//!                                                   └─▶ data requests (subscribers)
//! ```
//!
//! Exactly `1 + 3 * entries` creation requests are issued, in registry order.
//! The first non-success status aborts the run; data requests are only
//! issued after every entry succeeded.

use log::{debug, error, info};

use crate::app::ports::{
    CreateRequest, CreationMode, DeliveryControl, InboundHandler, ReliableChannel, RequestId,
    SessionStreams,
};
use crate::config::ClientConfig;
use crate::error::{ProvisioningFailure, ProvisioningStage};
use crate::registry::{EndpointDescriptor, ObjectId, ObjectKind, Role, TopicRegistry};

use super::{status_name, status_ok, STATUS_NONE};

// ---------------------------------------------------------------------------
// Correlation set
// ---------------------------------------------------------------------------

/// Bounded list of outstanding request ids and their status slots.
///
/// Built right before a batch and consumed by exactly one blocking wait.
#[derive(Debug)]
pub struct CorrelationSet<const N: usize> {
    requests: heapless::Vec<RequestId, N>,
    statuses: [u8; N],
}

impl<const N: usize> CorrelationSet<N> {
    pub fn new() -> Self {
        Self {
            requests: heapless::Vec::new(),
            statuses: [STATUS_NONE; N],
        }
    }

    /// Track `request`.  Returns `false` when the set is full.
    pub fn push(&mut self, request: RequestId) -> bool {
        self.requests.push(request).is_ok()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn status(&self, slot: usize) -> Option<u8> {
        (slot < self.requests.len()).then(|| self.statuses[slot])
    }

    /// Block on the channel until every tracked status arrived or
    /// `timeout_ms` elapsed.
    pub fn wait(
        mut self,
        channel: &mut impl ReliableChannel,
        timeout_ms: u32,
        inbound: &mut dyn InboundHandler,
    ) -> BatchOutcome {
        let len = self.requests.len();
        let all_ok =
            channel.run_until_all_status(timeout_ms, &self.requests, &mut self.statuses[..len], inbound);
        let failed = self.statuses[..len]
            .iter()
            .position(|&s| !status_ok(s))
            .map(|slot| (slot, self.statuses[slot]))
            .or_else(|| (!all_ok).then_some((0, STATUS_NONE)));
        BatchOutcome { failed }
    }
}

impl<const N: usize> Default for CorrelationSet<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one batched wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// First failing slot and its status.
    pub failed: Option<(usize, u8)>,
}

// ---------------------------------------------------------------------------
// Provisioning run
// ---------------------------------------------------------------------------

/// Counts reported by a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub entries: usize,
    pub data_requests: usize,
}

const ENTRY_STAGES: [ProvisioningStage; 3] = [
    ProvisioningStage::Topic,
    ProvisioningStage::Role,
    ProvisioningStage::DataEntity,
];

/// Create the participant and every registry entry, then issue the standing
/// data requests of all subscribers.
pub fn provision(
    channel: &mut impl ReliableChannel,
    config: &ClientConfig,
    registry: &TopicRegistry,
    streams: &SessionStreams,
    inbound: &mut dyn InboundHandler,
) -> Result<ProvisioningReport, ProvisioningFailure> {
    let out = streams.reliable_out;
    let participant = ObjectId::new(config.participant_id, ObjectKind::Participant);

    // 1. Participant
    let mut batch = CorrelationSet::<1>::new();
    batch.push(channel.buffer_create(
        out,
        &CreateRequest::Participant {
            id: participant,
            domain_id: config.domain_id,
            name: &config.participant_name,
        },
        CreationMode::Replace,
    ));
    if let Some((_, status)) = batch.wait(channel, config.request_timeout_ms, inbound).failed {
        error!(
            "participant '{}' creation failed: status 0x{:02x} ({})",
            config.participant_name,
            status,
            status_name(status)
        );
        return Err(ProvisioningFailure {
            stage: ProvisioningStage::Participant,
            entry: None,
            status,
        });
    }
    debug!("participant 0x{:04x} created", participant.raw());

    // 2. Topic, role and data entity per entry
    for (index, entry) in registry.iter().enumerate() {
        let mut batch = CorrelationSet::<3>::new();
        for request in entry_requests(entry, participant) {
            batch.push(channel.buffer_create(out, &request, CreationMode::Replace));
        }
        if let Some((slot, status)) = batch.wait(channel, config.request_timeout_ms, inbound).failed {
            let stage = ENTRY_STAGES[slot.min(ENTRY_STAGES.len() - 1)];
            error!(
                "entry {} '{}': {} creation failed: status 0x{:02x} ({})",
                index,
                entry.topic_name,
                stage,
                status,
                status_name(status)
            );
            return Err(ProvisioningFailure {
                stage,
                entry: Some(index),
                status,
            });
        }
        debug!("entry {} '{}' created", index, entry.topic_name);
    }

    // 3. Standing data requests
    let mut data_requests = 0;
    for (index, entry) in registry.subscribers() {
        let control = DeliveryControl::for_rate_limit(entry.rate_limit);
        let request =
            channel.buffer_request_data(out, entry.data_entity_id, streams.reliable_in, &control);
        debug!(
            "entry {} '{}': data request {} ({} B/s)",
            index, entry.topic_name, request, control.max_bytes_per_second
        );
        data_requests += 1;
    }

    info!(
        "provisioned {} entries, {} data requests",
        registry.len(),
        data_requests
    );
    Ok(ProvisioningReport {
        entries: registry.len(),
        data_requests,
    })
}

/// Topic, role and data-entity requests of one entry, in that order.
fn entry_requests(entry: &EndpointDescriptor, participant: ObjectId) -> [CreateRequest<'_>; 3] {
    let topic = CreateRequest::Topic {
        id: entry.topic_id,
        participant,
        name: &entry.topic_name,
        type_name: &entry.type_name,
    };
    match entry.role {
        Role::Publisher => [
            topic,
            CreateRequest::Publisher {
                id: entry.role_id,
                participant,
            },
            CreateRequest::DataWriter {
                id: entry.data_entity_id,
                publisher: entry.role_id,
                topic: entry.topic_id,
                qos: entry.qos,
            },
        ],
        Role::Subscriber => [
            topic,
            CreateRequest::Subscriber {
                id: entry.role_id,
                participant,
            },
            CreateRequest::DataReader {
                id: entry.data_entity_id,
                subscriber: entry.role_id,
                topic: entry.topic_id,
                qos: entry.qos,
            },
        ],
    }
}
