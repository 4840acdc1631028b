//! Packet encode/decode (panic-free).
//!
//! Parsing rules:
//! - Never index (`buf[0]`) — always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, SwiftSrvError};

/// Operation byte plus payload length prefix.
pub const HEADER_LEN: usize = 1 + 4;
/// Trailing CRC-32.
pub const TRAILER_LEN: usize = 4;
/// Default upper bound on a declared payload length (64 KiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Requested action. Values `2..=254` are reserved and decode as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Nop,
    Demangle,
    Fail,
    Unknown(u8),
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Nop => 0,
            Operation::Demangle => 1,
            Operation::Fail => 0xFF,
            Operation::Unknown(v) => v,
        }
    }

    /// Canonical form: `Unknown(0)`, `Unknown(1)` and `Unknown(255)` name
    /// operations that have their own variant.
    pub fn normalized(self) -> Self {
        Operation::from(self.as_u8())
    }

    /// Label used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Nop => "nop",
            Operation::Demangle => "demangle",
            Operation::Fail => "fail",
            Operation::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for Operation {
    fn from(v: u8) -> Self {
        match v {
            0 => Operation::Nop,
            1 => Operation::Demangle,
            0xFF => Operation::Fail,
            other => Operation::Unknown(other),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Unknown(v) => write!(f, "unknown({v})"),
            op => f.write_str(op.name()),
        }
    }
}

/// CRC-32 (ISO-3309, same polynomial as zlib) over the exact payload bytes.
pub fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// One request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub operation: Operation,
    pub payload: Bytes,
    /// CRC-32 as carried on the wire; not trusted until `is_valid`.
    pub checksum: u32,
}

impl Packet {
    /// Build a packet whose checksum matches its payload. The operation is
    /// stored in canonical form.
    pub fn new(operation: Operation, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum(&payload);
        Self {
            operation: operation.normalized(),
            payload,
            checksum,
        }
    }

    /// Empty-payload packet, used for `FAIL` and `NOP` replies.
    pub fn empty(operation: Operation) -> Self {
        Self::new(operation, Bytes::new())
    }

    pub fn is_valid(&self) -> bool {
        self.checksum == checksum(&self.payload)
    }

    /// Like `is_valid`, but reports both values on mismatch.
    pub fn verify(&self) -> Result<()> {
        let actual = checksum(&self.payload);
        if self.checksum != actual {
            return Err(SwiftSrvError::InvalidChecksum {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// Size of this packet on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + TRAILER_LEN
    }
}

/// Encode a packet into its wire form.
pub fn encode(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(packet.encoded_len());
    buf.put_u8(packet.operation.as_u8());
    buf.put_u32_le(packet.payload.len() as u32);
    buf.put_slice(&packet.payload);
    buf.put_u32_le(packet.checksum);
    buf.freeze()
}

/// Parse the fixed header, returning the operation and declared payload length.
///
/// The length is checked against `max_payload` before any payload is read so a
/// hostile prefix cannot force a large allocation.
pub fn parse_header(mut header: &[u8], max_payload: usize) -> Result<(Operation, usize)> {
    if header.remaining() < HEADER_LEN {
        return Err(SwiftSrvError::Malformed(format!(
            "header needs {HEADER_LEN} bytes, got {}",
            header.remaining()
        )));
    }
    let operation = Operation::from(header.get_u8());
    let declared = header.get_u32_le() as usize;
    if declared > max_payload {
        return Err(SwiftSrvError::PayloadTooLarge {
            declared,
            max: max_payload,
        });
    }
    Ok((operation, declared))
}

/// Decode one packet from the front of `buf`.
///
/// Bytes following a complete packet are ignored.
pub fn decode(mut buf: Bytes, max_payload: usize) -> Result<Packet> {
    let (operation, len) = parse_header(&buf, max_payload)?;
    buf.advance(HEADER_LEN);

    if buf.remaining() < len {
        return Err(SwiftSrvError::Malformed(format!(
            "payload declares {len} bytes, only {} available",
            buf.remaining()
        )));
    }
    let payload = buf.copy_to_bytes(len);

    if buf.remaining() < TRAILER_LEN {
        return Err(SwiftSrvError::Malformed("missing checksum".into()));
    }
    let checksum = buf.get_u32_le();

    Ok(Packet {
        operation,
        payload,
        checksum,
    })
}
