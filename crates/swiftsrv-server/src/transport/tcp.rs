//! TCP listener and per-connection request loop.
//!
//! Responsibilities:
//! - Accept connections, one task per connection
//! - Persistent connections: serve sequential requests until the peer closes,
//!   goes idle, or sends something unparseable
//! - Map every request to exactly one response (`FAIL` on any dispatch error)
//! - Drop the connection without a response on framing errors
//! - Drop it too when a response cannot be written within the read timeout

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use swiftsrv_core::error::Result;
use swiftsrv_core::protocol::{Operation, Packet};
use swiftsrv_core::ErrorKind;

use crate::app_state::AppState;
use crate::transport::codec;

/// Back-off after a failed `accept` (e.g. fd exhaustion) so the loop does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub struct Server {
    listener: TcpListener,
    state: AppState,
}

impl Server {
    /// Bind to the configured endpoint.
    pub async fn bind(state: AppState) -> Result<Self> {
        let addr = state.cfg().server.endpoint().resolve()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    /// Serve on an already bound listener.
    pub fn from_listener(listener: TcpListener, state: AppState) -> Self {
        Self { listener, state }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Accept forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept until `shutdown` resolves. Connections already in flight keep
    /// running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let local = self.local_addr()?;
        tracing::info!(%local, "swiftsrv listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(%local, "shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = self.state.clone();
                        let span = tracing::info_span!("conn", %peer);
                        tokio::spawn(handle_connection(state, stream, peer).instrument(span));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        }
    }
}

async fn handle_connection(state: AppState, mut stream: TcpStream, peer: SocketAddr) {
    let metrics = state.metrics();
    metrics.connections_accepted.inc(&[]);
    metrics.connections_active.inc(&[]);
    tracing::debug!(%peer, "connection accepted");

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "set_nodelay failed");
    }

    let limits = *state.limits();
    let dispatcher = state.dispatcher();
    let (mut rd, mut wr) = stream.split();
    let mut served = 0u64;

    loop {
        let request = match codec::read_packet(&mut rd, &limits).await {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(e) => {
                let kind = e.kind();
                metrics.decode_errors.inc(&[("kind", kind.as_str())]);
                tracing::warn!(kind = kind.as_str(), error = %e, "dropping connection without response");
                break;
            }
        };

        let op = request.operation;
        let started = Instant::now();
        let (response, outcome) = match dispatcher.dispatch(request).await {
            Ok(p) => (p, "ok"),
            Err(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::InvalidChecksum => {
                        tracing::warn!(%op, error = %e, "checksum mismatch, answering FAIL")
                    }
                    _ => tracing::info!(%op, kind = kind.as_str(), error = %e, "answering FAIL"),
                }
                (Packet::empty(Operation::Fail), kind.as_str())
            }
        };
        metrics.requests.inc(&[("op", op.name()), ("outcome", outcome)]);
        metrics
            .dispatch_duration
            .observe(&[("op", op.name())], started.elapsed());

        if let Err(e) = codec::send_packet(&mut wr, &response, &limits).await {
            tracing::debug!(error = %e, "write failed, closing");
            break;
        }
        served += 1;
    }

    metrics.connections_active.dec(&[]);
    tracing::debug!(%peer, served, "connection closed");
}
