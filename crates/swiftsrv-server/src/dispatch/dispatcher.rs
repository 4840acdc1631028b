use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use swiftsrv_core::error::{Result, SwiftSrvError};
use swiftsrv_core::protocol::{Operation, Packet};

/// Handler for one request operation. The returned bytes become the payload
/// of a response carrying the same operation.
#[async_trait]
pub trait OperationService: Send + Sync {
    fn operation(&self) -> Operation;
    async fn handle(&self, payload: Bytes) -> Result<Bytes>;
}

/// Registry and dispatcher for operation services.
#[derive(Default)]
pub struct Dispatcher {
    services: DashMap<Operation, Arc<dyn OperationService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service. `FAIL` is a response-only operation and is refused.
    pub fn register(&self, svc: Arc<dyn OperationService>) -> Result<()> {
        let op = svc.operation().normalized();
        if op == Operation::Fail {
            return Err(SwiftSrvError::Config("FAIL cannot be served".into()));
        }
        self.services.insert(op, svc);
        Ok(())
    }

    pub fn registered(&self) -> Vec<Operation> {
        self.services.iter().map(|e| *e.key()).collect()
    }

    /// Verify and route one request.
    ///
    /// Errors are the caller's cue to answer with `FAIL`: a checksum mismatch
    /// (`InvalidChecksum`), an operation nobody serves (`Rejected`), or the
    /// service's own failure.
    pub async fn dispatch(&self, request: Packet) -> Result<Packet> {
        request.verify()?;

        let op = request.operation.normalized();
        let handler = self
            .services
            .get(&op)
            .ok_or(SwiftSrvError::Rejected(op))?
            .value()
            .clone();

        let payload = handler.handle(request.payload).await?;
        Ok(Packet::new(op, payload))
    }
}
