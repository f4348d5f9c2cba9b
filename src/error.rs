//! Error types for flowsift.
//!
//! - [`enum@Error`] - Main error enum for engine operations
//! - [`PacketError`] - Errors from raw datagram parsing
//!
//! Nothing in this taxonomy is fatal: malformed packets are dropped and
//! ingestion continues, and a full flow table is resolved by evicting the
//! least-recently-seen flow. A rejected decode is not an error at all; decoders
//! signal it by returning `None`.

use thiserror::Error;

/// Main error type for flowsift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The packet could not be parsed; it was dropped without state change.
    #[error("malformed packet: {0}")]
    Malformed(#[from] PacketError),

    /// The flow table is at capacity and no flow could be evicted.
    ///
    /// Only reachable when the configured maximum flow count is zero; at any
    /// other capacity the oldest-idle flow is evicted to make room.
    #[error("flow table exhausted ({active} active flows)")]
    ResourceExhausted { active: usize },
}

/// Errors from parsing a raw IP datagram into a TCP segment.
#[derive(Error, Debug)]
pub enum PacketError {
    /// Datagram too short to hold an IP header.
    #[error("datagram too short (need {needed} bytes, have {have})")]
    TooShort { needed: usize, have: usize },

    /// First nibble is neither 4 nor 6.
    #[error("unsupported IP version {version}")]
    UnsupportedIpVersion { version: u8 },

    /// The datagram carries something other than TCP.
    #[error("not a TCP segment (IP protocol {protocol})")]
    NotTcp { protocol: u8 },

    /// Header fields failed validation.
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
