use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use swiftsrv_core::config::Endpoint;
use swiftsrv_core::error::{ErrorKind, Result, SwiftSrvError};
use swiftsrv_core::protocol::{stream, Operation, Packet, DEFAULT_MAX_PAYLOAD};

/// Returned for an empty name, without touching the network.
pub const NULL_NAME: &str = "<null>";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub connect_timeout: Duration,
    /// Applied to every socket read and write.
    pub io_timeout: Duration,
    pub max_payload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout: Duration::from_secs(2),
            io_timeout: Duration::from_secs(5),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ClientConfig {
    /// Defaults with the endpoint taken from `SWIFTSRV_HOST` / `SWIFTSRV_PORT`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::from_env()?,
            ..Self::default()
        })
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }
}

/// A single, lazily opened connection to the daemon.
///
/// The socket is reused across calls; any transport-level failure drops it so
/// the next call starts from a fresh connection. A socket the daemon closed
/// while we were idle is noticed before the next request and replaced.
#[derive(Debug)]
pub struct Connection {
    cfg: ClientConfig,
    stream: Option<TcpStream>,
    /// Address given to the last `connect(Some(..))`; reconnects go there too.
    target: Option<SocketAddr>,
}

impl Connection {
    pub fn new(cfg: ClientConfig) -> Self {
        Self {
            cfg,
            stream: None,
            target: None,
        }
    }

    /// Like `new`, but connects immediately.
    pub fn connect_now(cfg: ClientConfig) -> Result<Self> {
        let mut conn = Self::new(cfg);
        conn.connect(None)?;
        Ok(conn)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect to `addr`, or to the configured endpoint when `None`.
    /// An existing connection is closed first.
    ///
    /// An explicit address is remembered: later reconnects go to it until
    /// `connect(None)` switches back to the endpoint.
    pub fn connect(&mut self, addr: Option<SocketAddr>) -> Result<()> {
        self.target = addr;
        self.open()
    }

    fn open(&mut self) -> Result<()> {
        self.close();

        let addr = match self.target {
            Some(addr) => addr,
            None => self.cfg.endpoint.resolve()?,
        };
        let stream = TcpStream::connect_timeout(&addr, self.cfg.connect_timeout)?;
        stream.set_read_timeout(Some(self.cfg.io_timeout))?;
        stream.set_write_timeout(Some(self.cfg.io_timeout))?;
        stream.set_nodelay(true)?;

        tracing::debug!(%addr, "connected to swiftsrv");
        self.stream = Some(stream);
        Ok(())
    }

    /// Close the connection. Safe to call when not connected.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Demangle `name`, falling back to its lossy UTF-8 text on any failure.
    ///
    /// One attempt per call; there is no retry.
    pub fn demangle(&mut self, name: &[u8]) -> String {
        if name.is_empty() {
            return NULL_NAME.to_string();
        }

        match self.try_demangle(name) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(kind = e.kind().as_str(), error = %e, "demangle fell back to raw name");
                String::from_utf8_lossy(name).into_owned()
            }
        }
    }

    /// Demangle without the fallback, reporting what went wrong.
    pub fn try_demangle(&mut self, name: &[u8]) -> Result<String> {
        let response = self.exchange(&Packet::new(Operation::Demangle, name.to_vec()))?;
        if response.operation != Operation::Demangle {
            return Err(SwiftSrvError::Rejected(response.operation));
        }
        Ok(String::from_utf8_lossy(&response.payload).into_owned())
    }

    /// Round-trip a `NOP` to check the daemon is alive.
    pub fn ping(&mut self) -> Result<()> {
        let response = self.exchange(&Packet::empty(Operation::Nop))?;
        match response.operation {
            Operation::Nop => Ok(()),
            other => Err(SwiftSrvError::Rejected(other)),
        }
    }

    /// Send one request and read its checksum-verified response.
    pub fn exchange(&mut self, request: &Packet) -> Result<Packet> {
        let res = self.exchange_inner(request);
        if let Err(e) = &res {
            // A bad checksum leaves the stream aligned on a packet boundary;
            // anything else may have left half a packet in flight.
            if e.kind() != ErrorKind::InvalidChecksum {
                self.close();
            }
        }
        res
    }

    fn exchange_inner(&mut self, request: &Packet) -> Result<Packet> {
        if self.stream.as_ref().is_some_and(is_stale) {
            tracing::debug!("daemon closed the idle connection, reconnecting");
            self.close();
        }
        if !self.is_connected() {
            self.open()?;
        }
        let max_payload = self.cfg.max_payload_bytes;
        let sock = self.stream.as_mut().ok_or(SwiftSrvError::Closed)?;

        stream::write_packet(sock, request)?;
        let response = stream::read_packet(sock, max_payload)?;
        response.verify()?;
        Ok(response)
    }
}

/// Whether an idle socket can no longer carry a request: the peer closed it,
/// it errored, or it holds bytes nobody asked for.
fn is_stale(stream: &TcpStream) -> bool {
    if stream.set_nonblocking(true).is_err() {
        return true;
    }
    let mut byte = [0u8; 1];
    let stale = match stream.peek(&mut byte) {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
        Ok(_) | Err(_) => true,
    };
    stream.set_nonblocking(false).is_err() || stale
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
