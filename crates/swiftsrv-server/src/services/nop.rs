use async_trait::async_trait;
use bytes::Bytes;

use swiftsrv_core::error::Result;
use swiftsrv_core::protocol::Operation;

use crate::dispatch::OperationService;

/// Answers `NOP` with an empty payload. Clients use it as a liveness check.
pub struct NopService;

#[async_trait]
impl OperationService for NopService {
    fn operation(&self) -> Operation {
        Operation::Nop
    }

    async fn handle(&self, _payload: Bytes) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}
