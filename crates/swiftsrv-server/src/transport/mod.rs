//! Transport layer (TCP).
//!
//! Exposes the listener/connection loop and the async packet framing it reads
//! requests with.

pub mod codec;
pub mod tcp;

pub use tcp::Server;
