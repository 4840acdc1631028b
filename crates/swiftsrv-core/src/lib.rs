//! swiftsrv core: wire-level packet format, error types, and shared config.
//!
//! This crate defines the packet codec and the error surface shared by the
//! demangling server and its blocking client. It intentionally carries no
//! async runtime so the client can stay synchronous.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SwiftSrvError`/`Result` so a bad
//! packet never takes down the process that decoded it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod demangle;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, Result, SwiftSrvError};
