//! Shared application state for the demangling server.
//!
//! Everything here is read-only after construction (metrics are atomics), so
//! connection tasks share it through a cheap `Arc` clone.

use std::sync::Arc;

use swiftsrv_core::demangle::Demangler;
use swiftsrv_core::error::Result;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::obs::ServerMetrics;
use crate::services::{CommandDemangler, DemangleService, NopService};
use crate::transport::codec::FrameLimits;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<ServerMetrics>,
}

struct AppStateInner {
    cfg: ServerConfig,
    limits: FrameLimits,
}

impl AppState {
    /// Build state around the external demangler named in the config.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let demangler = Arc::new(CommandDemangler::from_config(&cfg.demangler));
        Self::with_demangler(cfg, demangler)
    }

    /// Build state around a caller-supplied demangler.
    pub fn with_demangler(cfg: ServerConfig, demangler: Arc<dyn Demangler>) -> Result<Self> {
        cfg.validate()?;

        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(NopService))?;
        dispatcher.register(Arc::new(DemangleService::new(
            demangler,
            cfg.demangler.timeout(),
        )))?;

        let limits = FrameLimits::from_config(&cfg.server);
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, limits }),
            dispatcher: Arc::new(dispatcher),
            metrics: Arc::new(ServerMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.inner.limits
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }
}
