//! Blocking client for the swiftsrv demangling daemon.
//!
//! Demangled names are a cosmetic improvement for reports, so `demangle`
//! never fails: when the daemon is unreachable or answers badly, callers get
//! the raw name back (lossily decoded as UTF-8).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod connection;

pub use connection::{ClientConfig, Connection, NULL_NAME};
