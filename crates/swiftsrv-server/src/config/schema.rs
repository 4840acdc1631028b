use std::time::Duration;

use serde::Deserialize;
use swiftsrv_core::config::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
use swiftsrv_core::error::{Result, SwiftSrvError};
use swiftsrv_core::protocol::DEFAULT_MAX_PAYLOAD;

const MAX_PAYLOAD_CEILING: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub demangler: DemanglerSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            demangler: DemanglerSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SwiftSrvError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.demangler.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Deadline for the rest of a packet once its first byte arrived.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// How long a persistent connection may sit between requests.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_payload_bytes: default_max_payload_bytes(),
            read_timeout_ms: default_read_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SwiftSrvError::Config("server.host must not be empty".into()));
        }
        if !(1..=MAX_PAYLOAD_CEILING).contains(&self.max_payload_bytes) {
            return Err(SwiftSrvError::Config(format!(
                "server.max_payload_bytes must be between 1 and {MAX_PAYLOAD_CEILING}"
            )));
        }
        if !(100..=60_000).contains(&self.read_timeout_ms) {
            return Err(SwiftSrvError::Config(
                "server.read_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(self.read_timeout_ms..=3_600_000).contains(&self.idle_timeout_ms) {
            return Err(SwiftSrvError::Config(
                "server.idle_timeout_ms must be between read_timeout_ms and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn apply_endpoint_overrides(
        &mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<()> {
        let mut ep = self.endpoint();
        ep.apply_overrides(host, port)?;
        self.host = ep.host;
        self.port = ep.port;
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD
}
fn default_read_timeout_ms() -> u64 {
    5000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}

/// External demangler program, invoked as `<program> <args...> <name>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemanglerSection {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_demangle_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DemanglerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_ms: default_demangle_timeout_ms(),
        }
    }
}

impl DemanglerSection {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(SwiftSrvError::Config("demangler.program must not be empty".into()));
        }
        if !(100..=60_000).contains(&self.timeout_ms) {
            return Err(SwiftSrvError::Config(
                "demangler.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_program() -> String {
    "swift-demangle".into()
}
fn default_args() -> Vec<String> {
    vec!["--compact".into()]
}
fn default_demangle_timeout_ms() -> u64 {
    5000
}
