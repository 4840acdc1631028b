use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use swiftsrv_core::demangle::Demangler;
use swiftsrv_core::error::{Result, SwiftSrvError};
use swiftsrv_core::protocol::Operation;

use crate::dispatch::OperationService;

/// Serves `DEMANGLE` by handing the payload to a `Demangler`.
///
/// Demanglers are synchronous (and may spawn processes), so each call runs on
/// the blocking pool under a deadline.
pub struct DemangleService {
    demangler: Arc<dyn Demangler>,
    timeout: Duration,
}

impl DemangleService {
    pub fn new(demangler: Arc<dyn Demangler>, timeout: Duration) -> Self {
        Self { demangler, timeout }
    }
}

#[async_trait]
impl OperationService for DemangleService {
    fn operation(&self) -> Operation {
        Operation::Demangle
    }

    async fn handle(&self, payload: Bytes) -> Result<Bytes> {
        let demangler = Arc::clone(&self.demangler);
        let job = tokio::task::spawn_blocking(move || demangler.demangle(&payload));

        let text = tokio::time::timeout(self.timeout, job)
            .await
            .map_err(|_| SwiftSrvError::Demangle("demangler timed out".into()))?
            .map_err(|e| SwiftSrvError::Demangle(format!("demangler panicked: {e}")))??;

        Ok(Bytes::from(text.into_bytes()))
    }
}
