//! Server + client over real sockets with a stub demangler.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use swiftsrv_client::{ClientConfig, Connection};
use swiftsrv_core::config::Endpoint;
use swiftsrv_core::demangle::{Demangler, FnDemangler};
use swiftsrv_core::protocol::{encode, Operation, Packet};
use swiftsrv_core::{Result, SwiftSrvError};
use swiftsrv_server::config::ServerConfig;
use swiftsrv_server::transport::codec::{self, FrameLimits};
use swiftsrv_server::{AppState, Server};

struct Running {
    addr: SocketAddr,
    state: AppState,
    _shutdown: oneshot::Sender<()>,
}

async fn start(demangler: Arc<dyn Demangler>) -> Running {
    start_with(ServerConfig::default(), demangler).await
}

/// Server with short read and idle timeouts.
async fn start_impatient(demangler: Arc<dyn Demangler>) -> Running {
    let mut cfg = ServerConfig::default();
    cfg.server.read_timeout_ms = 100;
    cfg.server.idle_timeout_ms = 200;
    start_with(cfg, demangler).await
}

async fn start_with(cfg: ServerConfig, demangler: Arc<dyn Demangler>) -> Running {
    let state = AppState::with_demangler(cfg, demangler).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server::from_listener(listener, state.clone());
    let addr = server.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async move {
        let _ = rx.await;
    }));

    Running {
        addr,
        state,
        _shutdown: tx,
    }
}

fn suffixing() -> Arc<dyn Demangler> {
    Arc::new(FnDemangler(|name: &[u8]| -> Result<String> {
        Ok(format!("{}-demangled", String::from_utf8_lossy(name)))
    }))
}

fn client(addr: SocketAddr) -> Connection {
    Connection::new(ClientConfig::with_endpoint(Endpoint::new(
        addr.ip().to_string(),
        addr.port(),
    )))
}

fn limits() -> FrameLimits {
    FrameLimits {
        max_payload: 64 * 1024,
        read_timeout: Duration::from_secs(2),
        idle_timeout: Duration::from_secs(2),
    }
}

async fn raw_exchange(sock: &mut TcpStream, wire: &[u8]) -> Option<Packet> {
    sock.write_all(wire).await.unwrap();
    codec::read_packet(sock, &limits()).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_receives_demangled_name() {
    let srv = start(suffixing()).await;
    let addr = srv.addr;

    let out = tokio::task::spawn_blocking(move || client(addr).demangle(b"SomeMangledName"))
        .await
        .unwrap();
    assert_eq!(out, "SomeMangledName-demangled");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn persistent_connection_serves_sequential_requests() {
    let srv = start(suffixing()).await;
    let addr = srv.addr;

    let (a, b, c) = tokio::task::spawn_blocking(move || {
        let mut conn = client(addr);
        let a = conn.demangle(b"first");
        let b = conn.demangle(b"second");
        let c = conn.ping().is_ok();
        (a, b, c)
    })
    .await
    .unwrap();

    assert_eq!(a, "first-demangled");
    assert_eq!(b, "second-demangled");
    assert!(c);

    let m = srv.state.metrics();
    assert_eq!(m.connections_accepted.get(&[]), 1);
    assert_eq!(m.requests.get(&[("op", "demangle"), ("outcome", "ok")]), 2);
    assert_eq!(m.requests.get(&[("op", "nop"), ("outcome", "ok")]), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_get_their_own_answers() {
    let srv = start(Arc::new(FnDemangler(|name: &[u8]| -> Result<String> {
        // Slow enough that the connections genuinely overlap.
        std::thread::sleep(Duration::from_millis(50));
        Ok(String::from_utf8_lossy(name).to_uppercase())
    })))
    .await;
    let addr = srv.addr;

    let jobs: Vec<_> = (0..8)
        .map(|i| {
            tokio::task::spawn_blocking(move || {
                let name = format!("client{i}name");
                let mut conn = client(addr);
                let first = conn.demangle(name.as_bytes());
                let second = conn.demangle(format!("{name}again").as_bytes());
                (name, first, second)
            })
        })
        .collect();

    for job in jobs {
        let (name, first, second) = job.await.unwrap();
        assert_eq!(first, name.to_uppercase());
        assert_eq!(second, format!("{name}again").to_uppercase());
    }
    assert_eq!(srv.state.metrics().connections_accepted.get(&[]), 8);
}

#[tokio::test]
async fn bad_checksum_gets_fail_and_connection_survives() {
    let srv = start(suffixing()).await;
    let mut sock = TcpStream::connect(srv.addr).await.unwrap();

    let mut bad = Packet::new(Operation::Demangle, &b"$s4main3FooV"[..]);
    bad.checksum ^= 0x8000_0000;
    let resp = raw_exchange(&mut sock, &encode(&bad)).await.unwrap();
    assert_eq!(resp.operation, Operation::Fail);
    assert!(resp.payload.is_empty());
    assert!(resp.is_valid());

    let good = Packet::new(Operation::Demangle, &b"Foo"[..]);
    let resp = raw_exchange(&mut sock, &encode(&good)).await.unwrap();
    assert_eq!(resp.operation, Operation::Demangle);
    assert_eq!(&resp.payload[..], b"Foo-demangled");

    let m = srv.state.metrics();
    assert_eq!(m.requests.get(&[("op", "demangle"), ("outcome", "invalid_checksum")]), 1);
    assert_eq!(m.decode_errors.get(&[("kind", "malformed")]), 0);
}

#[tokio::test]
async fn truncated_packet_is_dropped_without_response() {
    let srv = start(suffixing()).await;
    let mut sock = TcpStream::connect(srv.addr).await.unwrap();

    let wire = encode(&Packet::new(Operation::Demangle, &b"$s4main3FooV"[..]));
    sock.write_all(&wire[..8]).await.unwrap();
    sock.shutdown().await.unwrap();

    let mut rest = Vec::new();
    let n = sock.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0, "malformed input must not be answered");

    let m = srv.state.metrics();
    assert_eq!(m.decode_errors.get(&[("kind", "malformed")]), 1);
    assert_eq!(m.requests.get(&[("op", "demangle"), ("outcome", "invalid_checksum")]), 0);
}

#[tokio::test]
async fn oversize_length_prefix_is_dropped() {
    let srv = start(suffixing()).await;
    let mut sock = TcpStream::connect(srv.addr).await.unwrap();

    let mut wire = vec![1u8];
    wire.extend_from_slice(&(64 * 1024 * 1024u32).to_le_bytes());
    sock.write_all(&wire).await.unwrap();

    let mut rest = Vec::new();
    let n = sock.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0);
    assert_eq!(
        srv.state.metrics().decode_errors.get(&[("kind", "payload_too_large")]),
        1
    );
}

#[tokio::test]
async fn unknown_and_fail_operations_answer_fail() {
    let srv = start(suffixing()).await;
    let mut sock = TcpStream::connect(srv.addr).await.unwrap();

    for op in [Operation::Unknown(2), Operation::Unknown(254), Operation::Fail] {
        let resp = raw_exchange(&mut sock, &encode(&Packet::new(op, &b"x"[..])))
            .await
            .unwrap();
        assert_eq!(resp.operation, Operation::Fail, "op={op}");
        assert!(resp.payload.is_empty());
    }

    let resp = raw_exchange(&mut sock, &encode(&Packet::empty(Operation::Nop)))
        .await
        .unwrap();
    assert_eq!(resp.operation, Operation::Nop);
    assert!(resp.payload.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demangler_failure_is_fail_and_client_falls_back() {
    let srv = start(Arc::new(FnDemangler(|_: &[u8]| -> Result<String> {
        Err(SwiftSrvError::Demangle("not a swift symbol".into()))
    })))
    .await;
    let addr = srv.addr;

    let out = tokio::task::spawn_blocking(move || client(addr).demangle(b"_ZN3foo3barEv"))
        .await
        .unwrap();
    assert_eq!(out, "_ZN3foo3barEv");
    assert_eq!(
        srv.state.metrics().requests.get(&[("op", "demangle"), ("outcome", "operational")]),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payload_larger_than_one_read() {
    let srv = start(suffixing()).await;
    let addr = srv.addr;
    let name = "N".repeat(20_000);

    let expected = format!("{name}-demangled");
    let out = tokio::task::spawn_blocking(move || client(addr).demangle(name.as_bytes()))
        .await
        .unwrap();
    assert_eq!(out, expected);
}

#[tokio::test]
async fn one_bad_connection_does_not_affect_others() {
    let srv = start(suffixing()).await;

    let mut bad = TcpStream::connect(srv.addr).await.unwrap();
    bad.write_all(&[1, 0xFF]).await.unwrap();
    // Leave `bad` hanging mid-header while another peer is served.

    let mut good = TcpStream::connect(srv.addr).await.unwrap();
    let resp = raw_exchange(&mut good, &encode(&Packet::new(Operation::Demangle, &b"ok"[..])))
        .await
        .unwrap();
    assert_eq!(&resp.payload[..], b"ok-demangled");
    drop(bad);
}

#[tokio::test]
async fn stalled_header_is_dropped_after_read_timeout() {
    let srv = start_impatient(suffixing()).await;
    let mut sock = TcpStream::connect(srv.addr).await.unwrap();
    sock.write_all(&[1, 0xFF]).await.unwrap();

    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(2), sock.read_to_end(&mut rest))
        .await
        .expect("server should give up on the stalled packet")
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(srv.state.metrics().decode_errors.get(&[("kind", "timeout")]), 1);
    assert_eq!(srv.state.metrics().connections_active.get(&[]), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_reconnects_after_idle_close() {
    let srv = start_impatient(suffixing()).await;
    let addr = srv.addr;

    let (a, b) = tokio::task::spawn_blocking(move || {
        let mut conn = client(addr);
        let a = conn.demangle(b"first");
        std::thread::sleep(Duration::from_millis(500));
        let b = conn.demangle(b"second");
        (a, b)
    })
    .await
    .unwrap();

    assert_eq!(a, "first-demangled");
    assert_eq!(b, "second-demangled");
    assert_eq!(srv.state.metrics().connections_accepted.get(&[]), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_goes_to_explicitly_connected_address() {
    let srv = start_impatient(suffixing()).await;
    let addr = srv.addr;

    let (a, b) = tokio::task::spawn_blocking(move || {
        // Nothing listens on the configured endpoint.
        let mut conn =
            Connection::new(ClientConfig::with_endpoint(Endpoint::new("127.0.0.1", 1)));
        conn.connect(Some(addr)).unwrap();
        let a = conn.demangle(b"first");
        std::thread::sleep(Duration::from_millis(500));
        let b = conn.demangle(b"second");
        (a, b)
    })
    .await
    .unwrap();

    assert_eq!(a, "first-demangled");
    assert_eq!(b, "second-demangled");
    assert_eq!(srv.state.metrics().connections_accepted.get(&[]), 2);
}
