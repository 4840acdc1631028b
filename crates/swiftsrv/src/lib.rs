//! Top-level facade crate for swiftsrv.
//!
//! Re-exports the packet core, the daemon library, and the blocking client so
//! users can depend on a single crate.

pub mod core {
    pub use swiftsrv_core::*;
}

pub mod server {
    pub use swiftsrv_server::*;
}

pub mod client {
    pub use swiftsrv_client::*;
}
