//! Endpoint shared by server and client.
//!
//! Read once from the environment at startup and handed to constructors;
//! nothing in the workspace consults the environment after that.

use std::env;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{Result, SwiftSrvError};

pub const ENV_HOST: &str = "SWIFTSRV_HOST";
pub const ENV_PORT: &str = "SWIFTSRV_PORT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 1298;

/// Bind (server) or connect (client) address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Defaults overridden by `SWIFTSRV_HOST` / `SWIFTSRV_PORT`.
    pub fn from_env() -> Result<Self> {
        let mut ep = Self::default();
        ep.apply_overrides(env::var(ENV_HOST).ok(), env::var(ENV_PORT).ok())?;
        Ok(ep)
    }

    /// Apply optional host/port overrides (environment-style strings).
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| SwiftSrvError::Config(format!("{ENV_PORT}={port:?}: {e}")))?;
        }
        Ok(())
    }

    /// Resolve to the first socket address.
    pub fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| SwiftSrvError::Config(format!("{self} resolves to no address")))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
