//! Connection protocol building blocks driven by the FSM state handlers.
//!
//! None of these own the channel; each borrows it for the duration of one
//! call so the session context stays the single owner of all state.

pub mod dispatch;
pub mod keepalive;
pub mod provisioning;
pub mod publisher;
pub mod time_sync;

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_OK_MATCHED: u8 = 0x01;
pub const STATUS_ERR_DDS_ERROR: u8 = 0x80;
pub const STATUS_ERR_MISMATCH: u8 = 0x81;
pub const STATUS_ERR_ALREADY_EXISTS: u8 = 0x82;
pub const STATUS_ERR_DENIED: u8 = 0x83;
pub const STATUS_ERR_UNKNOWN_REFERENCE: u8 = 0x84;
pub const STATUS_ERR_INVALID_DATA: u8 = 0x85;
pub const STATUS_ERR_INCOMPATIBLE: u8 = 0x86;
pub const STATUS_ERR_RESOURCES: u8 = 0x87;
/// No status arrived before the wait timed out.
pub const STATUS_NONE: u8 = 0xFF;

/// `OK` and `OK_MATCHED` are the only successes.
pub const fn status_ok(status: u8) -> bool {
    matches!(status, STATUS_OK | STATUS_OK_MATCHED)
}

/// Short name of a status byte for log lines.
pub const fn status_name(status: u8) -> &'static str {
    match status {
        STATUS_OK => "OK",
        STATUS_OK_MATCHED => "OK_MATCHED",
        STATUS_ERR_DDS_ERROR => "ERR_DDS_ERROR",
        STATUS_ERR_MISMATCH => "ERR_MISMATCH",
        STATUS_ERR_ALREADY_EXISTS => "ERR_ALREADY_EXISTS",
        STATUS_ERR_DENIED => "ERR_DENIED",
        STATUS_ERR_UNKNOWN_REFERENCE => "ERR_UNKNOWN_REFERENCE",
        STATUS_ERR_INVALID_DATA => "ERR_INVALID_DATA",
        STATUS_ERR_INCOMPATIBLE => "ERR_INCOMPATIBLE",
        STATUS_ERR_RESOURCES => "ERR_RESOURCES",
        STATUS_NONE => "NO_STATUS",
        _ => "UNKNOWN",
    }
}
