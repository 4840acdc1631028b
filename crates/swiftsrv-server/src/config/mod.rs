//! Server config loader (strict parsing).
//!
//! Precedence: built-in defaults, then the YAML file (if present), then the
//! `SWIFTSRV_HOST` / `SWIFTSRV_PORT` environment overrides.

pub mod schema;

use std::{env, fs, io};

use swiftsrv_core::config::{ENV_HOST, ENV_PORT};
use swiftsrv_core::error::{Result, SwiftSrvError};

pub use schema::{DemanglerSection, ServerConfig, ServerSection};

/// Environment variable naming the YAML file.
pub const ENV_CONFIG: &str = "SWIFTSRV_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "swiftsrv.yaml";

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SwiftSrvError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| SwiftSrvError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Startup loader used by the binary.
///
/// A missing file is not an error: the daemon runs on defaults, which is how
/// it is usually deployed in a container.
pub fn load_from_env() -> Result<ServerConfig> {
    let path = env::var(ENV_CONFIG).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut cfg = match fs::metadata(&path) {
        Ok(_) => load_from_file(&path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(%path, "no config file, using defaults");
            ServerConfig::default()
        }
        Err(e) => return Err(SwiftSrvError::Config(format!("stat {path} failed: {e}"))),
    };
    cfg.server
        .apply_endpoint_overrides(env::var(ENV_HOST).ok(), env::var(ENV_PORT).ok())?;
    Ok(cfg)
}
