//! swiftsrv server library entry.
//!
//! This crate wires the TCP transport, dispatcher, operation services, and
//! metrics into the demangling daemon. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod services;
pub mod transport;

pub use app_state::AppState;
pub use transport::Server;
