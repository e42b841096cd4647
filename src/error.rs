//! Unified error types for the xrcelink client.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! connection loop's error handling uniform.  All variants are `Copy` so they
//! can be stored in the FSM context and logged without allocation.
//!
//! Nothing here is escalated to a process fault: every category maps to
//! either "retry this step" or "restart the connection cycle".  The one
//! exception is a transport that cannot be opened at all on first start.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level client error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The byte transport failed to open, read or write.
    Transport(TransportError),
    /// The agent did not answer the liveness probe.
    LivenessTimeout,
    /// The agent refused or never acknowledged the session.
    SessionCreation,
    /// Entity creation returned a non-success status.
    Provisioning(ProvisioningFailure),
    /// A topic value could not be serialized or deserialized.
    Codec(CodecError),
    /// The keepalive monitor gave up on the peer.
    KeepaliveExceeded { misses: u8 },
    /// The topic table is inconsistent.
    Registry(RegistryError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::LivenessTimeout => write!(f, "agent did not answer ping"),
            Self::SessionCreation => write!(f, "session creation failed"),
            Self::Provisioning(e) => write!(f, "provisioning: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::KeepaliveExceeded { misses } => {
                write!(f, "keepalive exceeded after {misses} missed probes")
            }
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying channel could not be opened.
    OpenFailed,
    /// Operation on a transport that is not open.
    NotOpen,
    /// A read returned an error (timeouts are not errors).
    ReadFailed,
    /// A write returned an error or wrote a short frame.
    WriteFailed,
    /// The configured address could not be parsed or resolved.
    BadAddress,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "open failed"),
            Self::NotOpen => write!(f, "transport not open"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::BadAddress => write!(f, "bad address"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Provisioning failures
// ---------------------------------------------------------------------------

/// Which creation request of a provisioning step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStage {
    Participant,
    Topic,
    Role,
    DataEntity,
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant => write!(f, "participant"),
            Self::Topic => write!(f, "topic"),
            Self::Role => write!(f, "role"),
            Self::DataEntity => write!(f, "data entity"),
        }
    }
}

/// The first failing request of an aborted provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningFailure {
    pub stage: ProvisioningStage,
    /// Registry index of the entry, `None` for the participant.
    pub entry: Option<usize>,
    /// Raw status byte reported by the agent (`0xFF` = no reply).
    pub status: u8,
}

impl fmt::Display for ProvisioningFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(idx) => write!(
                f,
                "{} of entry {} failed with status 0x{:02x}",
                self.stage, idx, self.status
            ),
            None => write!(f, "{} failed with status 0x{:02x}", self.stage, self.status),
        }
    }
}

impl From<ProvisioningFailure> for Error {
    fn from(e: ProvisioningFailure) -> Self {
        Self::Provisioning(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Output buffer cannot hold the encoded value.
    BufferTooSmall,
    /// Input ended before the value was complete.
    Truncated,
    /// A string was not valid UTF-8 or missed its terminator.
    InvalidString,
    /// A value exceeds the type's declared bound.
    BoundExceeded,
    /// The value's kind does not match the codec asked to handle it.
    KindMismatch,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::Truncated => write!(f, "input truncated"),
            Self::InvalidString => write!(f, "invalid string"),
            Self::BoundExceeded => write!(f, "bound exceeded"),
            Self::KindMismatch => write!(f, "message kind mismatch"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// More entries than the fixed table capacity.
    Full,
    /// Two entries share an identifier (raw XRCE object id).
    DuplicateId(u16),
    /// An identifier's kind does not match the entry's role.
    RoleMismatch { index: usize },
    /// A publisher has no (or a zero) publish period.
    MissingPeriod { index: usize },
    /// An object id does not fit the 12-bit XRCE id space.
    IdOutOfRange { index: usize },
    /// A subscriber rate limit does not fit the 16-bit bytes/s field.
    RateLimitOutOfRange { index: usize },
    /// A topic or type name does not fit its fixed buffer.
    NameTooLong,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "topic table full"),
            Self::DuplicateId(raw) => write!(f, "duplicate object id 0x{raw:04x}"),
            Self::RoleMismatch { index } => write!(f, "entry {index}: id kind does not match role"),
            Self::MissingPeriod { index } => write!(f, "entry {index}: publisher without period"),
            Self::IdOutOfRange { index } => write!(f, "entry {index}: object id out of range"),
            Self::RateLimitOutOfRange { index } => {
                write!(f, "entry {index}: rate limit above {} B/s", u16::MAX)
            }
            Self::NameTooLong => write!(f, "topic or type name too long"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
