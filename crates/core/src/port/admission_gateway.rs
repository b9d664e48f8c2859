// Admission Gateway Port
// What a client sees of the admission controller, local or remote.

use async_trait::async_trait;

use crate::domain::{
    CompleteOutcome, Fingerprint, JoinOutcome, LeaveOutcome, QueueStatus, StartOutcome,
};
use crate::error::Result;

/// Client-facing queue operations
///
/// Implementations:
/// - AdmissionController: in-process
/// - VividQueueClient (sdk): JSON-RPC
///
/// `Err` is reserved for transport and fatal failures. Scheduling conflicts
/// and lost membership come back as `Ok` values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdmissionGateway: Send + Sync {
    async fn join(&self, owner_id: &str, fingerprint: &Fingerprint) -> Result<JoinOutcome>;

    async fn status(&self, queue_item_id: &str) -> Result<QueueStatus>;

    async fn start(&self, owner_id: &str) -> Result<StartOutcome>;

    async fn complete(&self, owner_id: &str) -> Result<CompleteOutcome>;

    async fn leave(&self, owner_id: &str, queue_item_id: &str) -> Result<LeaveOutcome>;
}
