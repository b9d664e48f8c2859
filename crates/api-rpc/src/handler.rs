//! RPC Method Handlers
//!
//! Thin adapters from wire types to `AdmissionController` calls.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    CheckRequest, CheckResponse, CompleteRequest, CompleteResponse, LeaveRequest, LeaveResponse,
    StartRequest, StartResponse, StatsResponse, StatusRequest, StatusResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use vivid_core::application::admission::validation::{validate_fingerprint, validate_submission};
use vivid_core::application::AdmissionController;
use vivid_core::domain::Fingerprint;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    controller: Arc<AdmissionController>,
    rate_limiter: Arc<RateLimiter>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(controller: Arc<AdmissionController>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            controller,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    fn throttle(&self, method: &'static str) -> Result<(), ErrorObjectOwned> {
        if self.rate_limiter.try_acquire() {
            Ok(())
        } else {
            warn!(method = method, "Request throttled");
            Err(throttled())
        }
    }

    /// queue.check.v1
    pub async fn check(&self, params: CheckRequest) -> Result<CheckResponse, ErrorObjectOwned> {
        self.throttle("queue.check.v1")?;
        let fingerprint = match params.fingerprint {
            Some(fingerprint) => {
                validate_fingerprint(&fingerprint).map_err(to_rpc_error)?;
                Fingerprint::new(fingerprint)
            }
            None => {
                validate_submission(&params.title, &params.content).map_err(to_rpc_error)?;
                Fingerprint::from_content(&params.title, &params.content)
            }
        };
        let outcome = self
            .controller
            .join(&params.owner_id, fingerprint)
            .await
            .map_err(to_rpc_error)?;
        Ok(outcome.into())
    }

    /// queue.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        self.throttle("queue.status.v1")?;
        let status = self
            .controller
            .status(&params.queue_item_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(status.into())
    }

    /// queue.start.v1
    pub async fn start(&self, params: StartRequest) -> Result<StartResponse, ErrorObjectOwned> {
        self.throttle("queue.start.v1")?;
        let outcome = self
            .controller
            .start(&params.owner_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(outcome.into())
    }

    /// queue.complete.v1 (never throttled: a dropped release stalls the queue)
    pub async fn complete(
        &self,
        params: CompleteRequest,
    ) -> Result<CompleteResponse, ErrorObjectOwned> {
        let outcome = self
            .controller
            .complete(&params.owner_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(CompleteResponse {
            success: true,
            released: outcome.released,
        })
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: LeaveRequest) -> Result<LeaveResponse, ErrorObjectOwned> {
        self.throttle("queue.leave.v1")?;
        let outcome = self
            .controller
            .leave(&params.owner_id, &params.queue_item_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(LeaveResponse {
            success: true,
            removed: outcome.removed,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let stats = self.controller.stats().map_err(to_rpc_error)?;
        Ok(StatsResponse::new(
            stats,
            self.rate_limiter.remaining(),
            self.start_time.elapsed().as_secs() as i64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use vivid_core::application::AdmissionConfig;
    use vivid_core::domain::{ClaimRejection, WaitEstimate};
    use vivid_core::port::id_provider::mocks::SequentialIdProvider;
    use vivid_core::port::rate_window_repository::mocks::InMemoryRateWindowRepository;
    use vivid_core::port::time_provider::mocks::ManualClock;

    fn handler_with_limit(burst: u32) -> RpcHandler {
        let controller = Arc::new(AdmissionController::new(
            AdmissionConfig::default(),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(ManualClock::new(1_000_000)),
            Arc::new(InMemoryRateWindowRepository::new()),
        ));
        RpcHandler::new(controller, Arc::new(RateLimiter::new(burst, 0)))
    }

    fn check(owner: &str) -> CheckRequest {
        CheckRequest {
            owner_id: owner.to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            fingerprint: None,
        }
    }

    #[tokio::test]
    async fn test_check_status_start_flow() {
        let handler = handler_with_limit(100);

        let first = handler.check(check("alice")).await.unwrap();
        assert!(first.can_process);

        let second = handler.check(check("bob")).await.unwrap();
        assert!(!second.can_process);
        assert_eq!(second.position, 1);

        let status = handler
            .status(StatusRequest {
                queue_item_id: second.queue_item_id.clone(),
            })
            .await
            .unwrap();
        assert!(status.in_queue);
        assert_eq!(status.estimated_wait_time, WaitEstimate::Unknown);

        // Conflicts are results, not RPC errors
        let start = handler
            .start(StartRequest {
                owner_id: "bob".to_string(),
            })
            .await
            .unwrap();
        assert!(!start.success);
        assert_eq!(start.error, Some(ClaimRejection::SlotOccupied));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent_over_rpc() {
        let handler = handler_with_limit(100);
        handler.check(check("alice")).await.unwrap();

        let req = || CompleteRequest {
            owner_id: "alice".to_string(),
        };
        let first = handler.complete(req()).await.unwrap();
        let second = handler.complete(req()).await.unwrap();
        assert!(first.success && first.released);
        assert!(second.success && !second.released);
    }

    #[tokio::test]
    async fn test_empty_submission_is_validation_error() {
        let handler = handler_with_limit(100);
        let err = handler
            .check(CheckRequest {
                owner_id: "alice".to_string(),
                title: String::new(),
                content: " ".to_string(),
                fingerprint: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_check_accepts_precomputed_fingerprint() {
        let handler = handler_with_limit(100);
        let fingerprint = Fingerprint::from_content("Title", "Body");
        let joined = handler
            .check(CheckRequest {
                owner_id: "alice".to_string(),
                title: String::new(),
                content: String::new(),
                fingerprint: Some(fingerprint.to_string()),
            })
            .await
            .unwrap();
        assert!(joined.can_process);

        let err = handler
            .check(CheckRequest {
                owner_id: "bob".to_string(),
                title: String::new(),
                content: String::new(),
                fingerprint: Some(String::new()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_status_unknown_id_is_not_an_error() {
        let handler = handler_with_limit(100);
        let status = handler
            .status(StatusRequest {
                queue_item_id: "gone".to_string(),
            })
            .await
            .unwrap();
        assert!(!status.in_queue);
    }

    #[tokio::test]
    async fn test_throttling_spares_complete() {
        let handler = handler_with_limit(1);
        handler.check(check("alice")).await.unwrap();

        let err = handler.check(check("bob")).await.unwrap_err();
        assert_eq!(err.code(), code::THROTTLED);

        let done = handler
            .complete(CompleteRequest {
                owner_id: "alice".to_string(),
            })
            .await
            .unwrap();
        assert!(done.released);
    }

    #[tokio::test]
    async fn test_leave_and_stats() {
        let handler = handler_with_limit(100);
        handler.check(check("alice")).await.unwrap();
        let bob = handler.check(check("bob")).await.unwrap();

        let left = handler
            .leave(LeaveRequest {
                owner_id: "bob".to_string(),
                queue_item_id: bob.queue_item_id,
            })
            .await
            .unwrap();
        assert!(left.removed);

        let stats = handler.stats().await.unwrap();
        assert_eq!(stats.waiting, 0);
        assert!(stats.processing.is_some());
    }
}
