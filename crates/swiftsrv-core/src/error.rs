//! Shared error type across swiftsrv crates.

use std::io;

use thiserror::Error;

use crate::protocol::Operation;

/// Coarse error classification (stable API, used for logs and metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Truncated header, payload or checksum.
    Malformed,
    /// Declared payload length exceeds the configured limit.
    PayloadTooLarge,
    /// Framing was fine but the CRC-32 did not match.
    InvalidChecksum,
    /// Peer answered with `FAIL` or an unexpected operation.
    Rejected,
    /// Peer closed the stream before sending a packet.
    Closed,
    /// A read, write or connect deadline elapsed.
    Timeout,
    /// Socket level failure.
    Transport,
    /// The demangler itself failed.
    Operational,
    /// Invalid configuration.
    Config,
}

impl ErrorKind {
    /// String representation used in log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::InvalidChecksum => "invalid_checksum",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Closed => "closed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Operational => "operational",
            ErrorKind::Config => "config",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SwiftSrvError>;

/// Unified error type used by core, server and client.
#[derive(Debug, Error)]
pub enum SwiftSrvError {
    #[error("malformed packet: {0}")]
    Malformed(String),
    #[error("payload too large: declared {declared} bytes, limit {max}")]
    PayloadTooLarge { declared: usize, max: usize },
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    InvalidChecksum { expected: u32, actual: u32 },
    #[error("request rejected by peer (op={0})")]
    Rejected(Operation),
    #[error("connection closed by peer")]
    Closed,
    #[error("timed out")]
    Timeout,
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("demangle failed: {0}")]
    Demangle(String),
    #[error("config: {0}")]
    Config(String),
}

impl SwiftSrvError {
    /// Map the error to its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwiftSrvError::Malformed(_) => ErrorKind::Malformed,
            SwiftSrvError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            SwiftSrvError::InvalidChecksum { .. } => ErrorKind::InvalidChecksum,
            SwiftSrvError::Rejected(_) => ErrorKind::Rejected,
            SwiftSrvError::Closed => ErrorKind::Closed,
            SwiftSrvError::Timeout => ErrorKind::Timeout,
            SwiftSrvError::Io(e) if is_timeout(e) => ErrorKind::Timeout,
            SwiftSrvError::Io(_) => ErrorKind::Transport,
            SwiftSrvError::Demangle(_) => ErrorKind::Operational,
            SwiftSrvError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Blocking sockets report an elapsed `SO_RCVTIMEO` as either kind depending
/// on the platform.
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
