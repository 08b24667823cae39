//! Network error types

use thiserror::Error;

/// Result type for network operations
pub type NetResult<T> = std::result::Result<T, NetError>;

/// Errors on the datagram channel.
#[derive(Debug, Error)]
pub enum NetError {
    /// An inbound datagram did not decode into a known message kind; a
    /// contract or version mismatch between fleet members
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An outbound message does not fit one datagram
    #[error("message of {size} bytes exceeds a single datagram")]
    Oversized { size: usize },

    /// Best-effort transmission failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
