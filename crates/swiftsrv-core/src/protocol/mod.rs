//! Packet protocol.
//!
//! Wire layout (all integers little-endian):
//!
//! ```text
//! +--------+-------------+-----------------+--------------+
//! | op: u8 | length: u32 | payload[length] | crc32: u32   |
//! +--------+-------------+-----------------+--------------+
//! ```
//!
//! - `packet`: the `Packet`/`Operation` types plus panic-free encode/decode.
//! - `stream`: blocking framing over `std::io` streams, looping reads until
//!   the declared length is satisfied.

pub mod packet;
pub mod stream;

pub use packet::{
    checksum, decode, encode, parse_header, Operation, Packet, DEFAULT_MAX_PAYLOAD, HEADER_LEN,
    TRAILER_LEN,
};
