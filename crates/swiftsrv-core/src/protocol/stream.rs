//! Blocking packet framing over `std::io` streams.
//!
//! A single `read` may return less than one packet (or a header split across
//! segments), so reads loop with `read_exact` until the declared length is
//! satisfied. The declared length is bounded by `max_payload`.

use std::io::{self, Read, Write};

use bytes::Bytes;

use super::packet::{encode, parse_header, Packet, HEADER_LEN, TRAILER_LEN};
use crate::error::{Result, SwiftSrvError};

/// Read exactly one packet.
///
/// EOF before the first byte is `Closed`; EOF anywhere later is `Malformed`.
pub fn read_packet<R: Read>(reader: &mut R, max_payload: usize) -> Result<Packet> {
    let mut header = [0u8; HEADER_LEN];
    let first = loop {
        match reader.read(&mut header[..1]) {
            Ok(0) => return Err(SwiftSrvError::Closed),
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };
    read_full(reader, &mut header[first..], "header")?;

    let (operation, len) = parse_header(&header, max_payload)?;

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload, "payload")?;

    let mut trailer = [0u8; TRAILER_LEN];
    read_full(reader, &mut trailer, "checksum")?;

    Ok(Packet {
        operation,
        payload: Bytes::from(payload),
        checksum: u32::from_le_bytes(trailer),
    })
}

/// Encode and write one packet, flushing the writer.
pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    writer.write_all(&encode(packet))?;
    writer.flush()?;
    Ok(())
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            SwiftSrvError::Malformed(format!("stream ended inside {what}"))
        }
        _ => SwiftSrvError::Io(e),
    })
}
