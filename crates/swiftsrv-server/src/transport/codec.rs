//! Async packet framing for the server side.
//!
//! - Waiting for the next request is bounded by the idle timeout; a clean
//!   EOF or an idle expiry at a packet boundary yields `Ok(None)`.
//! - Once the first byte arrived the rest of the packet must follow within
//!   the read timeout (`Timeout` otherwise).
//! - Reads loop until the declared length is satisfied; the declared length
//!   is checked against `max_payload` before anything is allocated.
//! - Responses get the read timeout as their write deadline.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use swiftsrv_core::error::{Result, SwiftSrvError};
use swiftsrv_core::protocol::{encode, parse_header, Packet, HEADER_LEN, TRAILER_LEN};

use crate::config::ServerSection;

#[derive(Debug, Clone, Copy)]
pub struct FrameLimits {
    pub max_payload: usize,
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
}

impl FrameLimits {
    pub fn from_config(cfg: &ServerSection) -> Self {
        Self {
            max_payload: cfg.max_payload_bytes,
            read_timeout: cfg.read_timeout(),
            idle_timeout: cfg.idle_timeout(),
        }
    }
}

/// Read the next request, or `None` when the peer is done.
pub async fn read_packet<R>(reader: &mut R, limits: &FrameLimits) -> Result<Option<Packet>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match timeout(limits.idle_timeout, reader.read(&mut header[..1])).await {
        Err(_) => {
            tracing::debug!(idle = ?limits.idle_timeout, "idle timeout between requests");
            return Ok(None);
        }
        Ok(Ok(0)) => return Ok(None),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(e.into()),
    }

    timeout(limits.read_timeout, read_rest(reader, header, limits.max_payload))
        .await
        .map_err(|_| SwiftSrvError::Timeout)?
        .map(Some)
}

async fn read_rest<R>(reader: &mut R, mut header: [u8; HEADER_LEN], max_payload: usize) -> Result<Packet>
where
    R: AsyncRead + Unpin,
{
    read_full(reader, &mut header[1..], "header").await?;
    let (operation, len) = parse_header(&header, max_payload)?;

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload, "payload").await?;

    let mut trailer = [0u8; TRAILER_LEN];
    read_full(reader, &mut trailer, "checksum").await?;

    Ok(Packet {
        operation,
        payload: Bytes::from(payload),
        checksum: u32::from_le_bytes(trailer),
    })
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(SwiftSrvError::Malformed(
            format!("stream ended inside {what}"),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(packet)).await?;
    writer.flush().await?;
    Ok(())
}

/// Write a response, giving up after the read timeout if the peer stopped
/// reading.
pub async fn send_packet<W>(writer: &mut W, packet: &Packet, limits: &FrameLimits) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    timeout(limits.read_timeout, write_packet(writer, packet))
        .await
        .map_err(|_| SwiftSrvError::Timeout)?
}
