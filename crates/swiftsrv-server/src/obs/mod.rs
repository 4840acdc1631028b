//! Lightweight in-process metrics.
//!
//! Counters are kept per error kind so malformed framing, oversize packets,
//! and checksum mismatches can be told apart. The binary logs a rendering on
//! shutdown.

pub mod metrics;

pub use metrics::ServerMetrics;
