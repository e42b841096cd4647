//! Topic registry.
//!
//! An ordered, validated, immutable table of endpoint descriptors.  The
//! position of an entry is its index for topic buffers and inbound routing,
//! so the table is built once and never reordered.
//!
//! ```text
//!   index │ topic     │ role       │ data entity │ message
//!   ──────┼───────────┼────────────┼─────────────┼────────
//!     0   │ 0x0012    │ 0x0013 pub │ 0x0015 dw   │ String
//!     1   │ 0x0022    │ 0x0024 sub │ 0x0026 dr   │ String
//! ```

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::messages::MessageKind;

/// Maximum number of registry entries.
pub const MAX_TOPICS: usize = 16;

/// Capacity of topic and type name buffers.
pub const NAME_CAPACITY: usize = 96;

/// Largest id representable in the 12-bit XRCE object id space.
pub const MAX_OBJECT_ID: u16 = 0x0FFF;

pub type NameString = heapless::String<NAME_CAPACITY>;

// ---------------------------------------------------------------------------
// Object identifiers
// ---------------------------------------------------------------------------

/// XRCE object kinds used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    Participant = 0x01,
    Topic = 0x02,
    Publisher = 0x03,
    Subscriber = 0x04,
    DataWriter = 0x05,
    DataReader = 0x06,
}

impl ObjectKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Participant),
            0x02 => Some(Self::Topic),
            0x03 => Some(Self::Publisher),
            0x04 => Some(Self::Subscriber),
            0x05 => Some(Self::DataWriter),
            0x06 => Some(Self::DataReader),
            _ => None,
        }
    }
}

/// A numeric id tagged with its object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub id: u16,
    pub kind: ObjectKind,
}

impl ObjectId {
    pub const fn new(id: u16, kind: ObjectKind) -> Self {
        Self { id, kind }
    }

    /// Wire form: 12-bit id in the high bits, 4-bit kind in the low bits.
    pub const fn raw(self) -> u16 {
        ((self.id & MAX_OBJECT_ID) << 4) | self.kind as u16
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        let kind = ObjectKind::from_u8((raw & 0x000F) as u8)?;
        Some(Self { id: raw >> 4, kind })
    }
}

// ---------------------------------------------------------------------------
// QoS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Durability {
    Volatile,
    TransientLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    BestEffort,
    Reliable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum History {
    KeepLast,
    KeepAll,
}

/// Data-entity QoS profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub depth: u16,
}

impl Default for Qos {
    /// Volatile, reliable, keep-last(5).
    fn default() -> Self {
        Self {
            durability: Durability::Volatile,
            reliability: Reliability::Reliable,
            history: History::KeepLast,
            depth: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Publisher,
    Subscriber,
}

impl Role {
    /// Object kinds of the role entity and data entity for this role.
    pub const fn kinds(self) -> (ObjectKind, ObjectKind) {
        match self {
            Self::Publisher => (ObjectKind::Publisher, ObjectKind::DataWriter),
            Self::Subscriber => (ObjectKind::Subscriber, ObjectKind::DataReader),
        }
    }
}

/// One row of the topic table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub topic_id: ObjectId,
    pub role: Role,
    /// Publisher or subscriber entity.
    pub role_id: ObjectId,
    /// Data writer or data reader entity.
    pub data_entity_id: ObjectId,
    pub topic_name: NameString,
    pub type_name: NameString,
    pub message: MessageKind,
    pub qos: Qos,
    /// Bytes per second granted to the standing data request (subscribers).
    pub rate_limit: Option<u32>,
    /// Publish interval in milliseconds (publishers).
    pub period_ms: Option<u32>,
}

impl EndpointDescriptor {
    /// Publisher entry whose topic, publisher and data writer share `id`.
    pub fn publisher(
        id: u16,
        namespace: &str,
        topic: &str,
        message: MessageKind,
        qos: Qos,
        period_ms: u32,
    ) -> Result<Self, RegistryError> {
        Self::build(id, Role::Publisher, namespace, topic, message, qos, None, Some(period_ms))
    }

    /// Subscriber entry whose topic, subscriber and data reader share `id`.
    pub fn subscriber(
        id: u16,
        namespace: &str,
        topic: &str,
        message: MessageKind,
        qos: Qos,
        rate_limit: Option<u32>,
    ) -> Result<Self, RegistryError> {
        Self::build(id, Role::Subscriber, namespace, topic, message, qos, rate_limit, None)
    }

    fn build(
        id: u16,
        role: Role,
        namespace: &str,
        topic: &str,
        message: MessageKind,
        qos: Qos,
        rate_limit: Option<u32>,
        period_ms: Option<u32>,
    ) -> Result<Self, RegistryError> {
        let (role_kind, data_kind) = role.kinds();
        Ok(Self {
            topic_id: ObjectId::new(id, ObjectKind::Topic),
            role,
            role_id: ObjectId::new(id, role_kind),
            data_entity_id: ObjectId::new(id, data_kind),
            topic_name: ros_topic_name(namespace, topic)?,
            type_name: ros_type_name(message)?,
            message,
            qos,
            rate_limit,
            period_ms,
        })
    }

    pub fn is_publisher(&self) -> bool {
        self.role == Role::Publisher
    }
}

/// `rt/<namespace>/<topic>`, or `rt/<topic>` with an empty namespace.
pub fn ros_topic_name(namespace: &str, topic: &str) -> Result<NameString, RegistryError> {
    let mut name = NameString::new();
    let written = if namespace.is_empty() {
        write!(name, "rt/{topic}")
    } else {
        write!(name, "rt/{namespace}/{topic}")
    };
    written.map_err(|_| RegistryError::NameTooLong)?;
    Ok(name)
}

/// DDS type name of a ROS 2 message, e.g. `std_msgs::msg::dds_::String_`.
pub fn ros_type_name(kind: MessageKind) -> Result<NameString, RegistryError> {
    let (package, ty) = kind.ros_name();
    let mut name = NameString::new();
    write!(name, "{package}::msg::dds_::{ty}_").map_err(|_| RegistryError::NameTooLong)?;
    Ok(name)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The validated topic table.
#[derive(Debug, Clone)]
pub struct TopicRegistry {
    entries: heapless::Vec<EndpointDescriptor, MAX_TOPICS>,
}

impl TopicRegistry {
    /// Validate `entries` and freeze them in declaration order.
    pub fn new(entries: &[EndpointDescriptor]) -> Result<Self, RegistryError> {
        if entries.len() > MAX_TOPICS {
            return Err(RegistryError::Full);
        }

        let mut seen: heapless::FnvIndexSet<u16, 64> = heapless::FnvIndexSet::new();
        let mut table = heapless::Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            Self::check_entry(index, entry)?;
            for oid in [entry.topic_id, entry.role_id, entry.data_entity_id] {
                let raw = oid.raw();
                match seen.insert(raw) {
                    Ok(true) => {}
                    Ok(false) => return Err(RegistryError::DuplicateId(raw)),
                    Err(_) => return Err(RegistryError::Full),
                }
            }
            table.push(entry.clone()).map_err(|_| RegistryError::Full)?;
        }

        Ok(Self { entries: table })
    }

    /// Default table: a `HelloWorld` talker and a `chatter` listener.
    pub fn standard(config: &ClientConfig) -> Result<Self, RegistryError> {
        let ns = config.topic_namespace.as_str();
        Self::new(&[
            EndpointDescriptor::publisher(
                0x01,
                ns,
                "HelloWorld",
                MessageKind::String,
                Qos::default(),
                config.talker_period_ms,
            )?,
            EndpointDescriptor::subscriber(
                0x02,
                ns,
                "chatter",
                MessageKind::String,
                Qos::default(),
                None,
            )?,
        ])
    }

    fn check_entry(index: usize, entry: &EndpointDescriptor) -> Result<(), RegistryError> {
        for oid in [entry.topic_id, entry.role_id, entry.data_entity_id] {
            if oid.id > MAX_OBJECT_ID {
                return Err(RegistryError::IdOutOfRange { index });
            }
        }

        let (role_kind, data_kind) = entry.role.kinds();
        if entry.topic_id.kind != ObjectKind::Topic
            || entry.role_id.kind != role_kind
            || entry.data_entity_id.kind != data_kind
        {
            return Err(RegistryError::RoleMismatch { index });
        }

        if entry.is_publisher() && !matches!(entry.period_ms, Some(p) if p > 0) {
            return Err(RegistryError::MissingPeriod { index });
        }

        if matches!(entry.rate_limit, Some(r) if r > u32::from(u16::MAX)) {
            return Err(RegistryError::RateLimitOutOfRange { index });
        }

        Ok(())
    }

    pub fn entries(&self) -> &[EndpointDescriptor] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EndpointDescriptor> {
        self.entries.get(index)
    }

    /// Publisher entries with their table index.
    pub fn publishers(&self) -> impl Iterator<Item = (usize, &EndpointDescriptor)> {
        self.entries.iter().enumerate().filter(|(_, e)| e.is_publisher())
    }

    /// Subscriber entries with their table index.
    pub fn subscribers(&self) -> impl Iterator<Item = (usize, &EndpointDescriptor)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_publisher())
    }
}
