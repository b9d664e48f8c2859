// Client Coordinator - drives one generation request through the admission queue
//
// join -> poll status -> start when ready -> run pipeline -> complete
//
// Works against any AdmissionGateway, so the same loop serves in-process
// callers and remote clients going through the SDK.

pub mod config;

pub use config::CoordinatorConfig;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::application::admission::validation::validate_submission;
use crate::application::estimator::is_ready;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::application::shutdown::ShutdownToken;
use crate::domain::{
    ClaimRejection, Fingerprint, QueueItemId, QueueStatus, StartOutcome, WaitEstimate,
};
use crate::error::AppError;
use crate::port::{
    AdmissionGateway, GenerationArtifact, GenerationPipeline, GenerationRequest, PipelineError,
};

/// Progress notices for whoever is watching (UI, CLI spinner, logs)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Joined {
        queue_item_id: QueueItemId,
        can_process: bool,
    },
    Queued {
        position: usize,
        total_in_queue: usize,
        estimated_wait: WaitEstimate,
    },
    /// The controller no longer knows our item; re-joining
    MembershipLost { rejoins: u32 },
    Started { queue_item_id: QueueItemId },
    PipelineFinished { success: bool },
    Completed { released: bool },
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Generation failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Queue error: {0}")]
    Gateway(#[from] AppError),

    #[error("Cancelled")]
    Cancelled,

    #[error("Lost queue membership too often (re-joined {0} times)")]
    RejoinLimitExceeded(u32),
}

pub struct ClientCoordinator {
    gateway: Arc<dyn AdmissionGateway>,
    pipeline: Arc<dyn GenerationPipeline>,
    config: CoordinatorConfig,
    events: Option<mpsc::UnboundedSender<CoordinatorEvent>>,
}

impl ClientCoordinator {
    pub fn new(
        gateway: Arc<dyn AdmissionGateway>,
        pipeline: Arc<dyn GenerationPipeline>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            gateway,
            pipeline,
            config,
            events: None,
        }
    }

    /// Report progress on `tx`; send failures (receiver gone) are ignored
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<CoordinatorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run `request` end to end.
    ///
    /// Once the slot is held, `complete` is always called, whether the
    /// pipeline succeeds, fails, panics or is cancelled. While waiting,
    /// cancellation or a fatal error leaves the queue before returning.
    pub async fn run(
        &self,
        request: GenerationRequest,
        mut shutdown: ShutdownToken,
    ) -> Result<GenerationArtifact, CoordinatorError> {
        validate_submission(&request.title, &request.content)?;
        let owner_id = request.owner_id.as_str();
        let fingerprint = request.fingerprint();
        let retry = self.config.retry.clone().with_jitter_key(owner_id);

        let mut membership: Option<QueueItemId> = None;
        let acquired = self
            .acquire_slot(owner_id, &fingerprint, &retry, &mut shutdown, &mut membership)
            .await;
        let queue_item_id = match acquired {
            Ok(id) => id,
            Err(e) => {
                if let Some(id) = membership {
                    self.leave_quietly(owner_id, &id).await;
                }
                return Err(e);
            }
        };

        info!(queue_item_id = %queue_item_id, owner_id = %owner_id, "Generation started");
        self.emit(CoordinatorEvent::Started {
            queue_item_id: queue_item_id.clone(),
        });

        let outcome = self.run_pipeline(&request, &mut shutdown).await;
        self.emit(CoordinatorEvent::PipelineFinished {
            success: matches!(outcome, Some(Ok(_))),
        });

        self.release(owner_id, &retry).await;

        match outcome {
            Some(Ok(artifact)) => {
                info!(
                    queue_item_id = %queue_item_id,
                    duration_ms = artifact.duration_ms,
                    "Generation finished"
                );
                Ok(artifact)
            }
            Some(Err(e)) => {
                error!(queue_item_id = %queue_item_id, error = %e, "Generation failed");
                Err(CoordinatorError::Pipeline(e))
            }
            None => {
                info!(queue_item_id = %queue_item_id, "Generation cancelled");
                Err(CoordinatorError::Cancelled)
            }
        }
    }

    /// Wait in line until the slot is ours; returns the processing item id
    async fn acquire_slot(
        &self,
        owner_id: &str,
        fingerprint: &Fingerprint,
        retry: &RetryPolicy,
        shutdown: &mut ShutdownToken,
        membership: &mut Option<QueueItemId>,
    ) -> Result<QueueItemId, CoordinatorError> {
        let gateway = &self.gateway;
        let mut rejoins = 0u32;

        let joined = self
            .call("join", retry, Some(&mut *shutdown), || {
                gateway.join(owner_id, fingerprint)
            })
            .await?;
        *membership = Some(joined.queue_item_id.clone());
        self.emit(CoordinatorEvent::Joined {
            queue_item_id: joined.queue_item_id.clone(),
            can_process: joined.can_process,
        });
        if joined.can_process {
            return Ok(joined.queue_item_id);
        }

        let mut item_id = joined.queue_item_id;
        let mut next_check = self.next_check(&joined.status);

        loop {
            sleep_or_cancel(next_check, shutdown).await?;

            let status = {
                let id = item_id.as_str();
                self.call("status", retry, Some(&mut *shutdown), || gateway.status(id))
                    .await?
            };

            if !status.in_queue {
                rejoins += 1;
                *membership = None;
                info!(
                    queue_item_id = %item_id,
                    owner_id = %owner_id,
                    rejoins = rejoins,
                    "Queue membership lost, re-joining"
                );
                self.emit(CoordinatorEvent::MembershipLost { rejoins });
                if rejoins > self.config.max_rejoins {
                    return Err(CoordinatorError::RejoinLimitExceeded(self.config.max_rejoins));
                }

                let joined = self
                    .call("join", retry, Some(&mut *shutdown), || {
                        gateway.join(owner_id, fingerprint)
                    })
                    .await?;
                *membership = Some(joined.queue_item_id.clone());
                self.emit(CoordinatorEvent::Joined {
                    queue_item_id: joined.queue_item_id.clone(),
                    can_process: joined.can_process,
                });
                if joined.can_process {
                    return Ok(joined.queue_item_id);
                }
                item_id = joined.queue_item_id;
                next_check = self.next_check(&joined.status);
                continue;
            }

            if status.is_processing {
                return Ok(item_id);
            }

            self.emit(CoordinatorEvent::Queued {
                position: status.position,
                total_in_queue: status.total_in_queue,
                estimated_wait: status.estimated_wait,
            });

            if !is_ready(status.position, status.estimated_wait, self.config.ready_margin_ms) {
                next_check = self.next_check(&status);
                continue;
            }

            sleep_or_cancel(self.config.start_grace, shutdown).await?;
            let started = self
                .call("start", retry, Some(&mut *shutdown), || gateway.start(owner_id))
                .await?;
            match started {
                StartOutcome::Started { queue_item_id } => return Ok(queue_item_id),
                StartOutcome::Rejected {
                    reason: ClaimRejection::AlreadyProcessing,
                    ..
                } => return Ok(item_id),
                StartOutcome::Rejected {
                    reason: ClaimRejection::NotFound,
                    ..
                } => {
                    // Next status call reports the loss and triggers a re-join
                    next_check = Duration::ZERO;
                }
                StartOutcome::Rejected {
                    reason,
                    retry_after_ms,
                } => {
                    debug!(
                        owner_id = %owner_id,
                        reason = %reason,
                        retry_after_ms = retry_after_ms,
                        "Start deferred"
                    );
                    next_check = Duration::from_millis(retry.hinted_delay_ms(retry_after_ms) as u64);
                }
            }
        }
    }

    /// Run the pipeline on its own task. `None` means cancelled.
    async fn run_pipeline(
        &self,
        request: &GenerationRequest,
        shutdown: &mut ShutdownToken,
    ) -> Option<Result<GenerationArtifact, PipelineError>> {
        let pipeline = Arc::clone(&self.pipeline);
        let job = request.clone();
        let mut handle = tokio::task::spawn(async move { pipeline.generate(&job).await });

        tokio::select! {
            joined = &mut handle => Some(match joined {
                Ok(result) => result,
                Err(join_err) => Err(PipelineError::Panicked(panic_message(join_err))),
            }),
            _ = shutdown.wait() => {
                handle.abort();
                None
            }
        }
    }

    /// Release the slot, retrying transport failures. Never cancelled.
    async fn release(&self, owner_id: &str, retry: &RetryPolicy) {
        let gateway = &self.gateway;
        match self
            .call("complete", retry, None, || gateway.complete(owner_id))
            .await
        {
            Ok(outcome) => {
                self.emit(CoordinatorEvent::Completed {
                    released: outcome.released,
                });
            }
            Err(e) => {
                // The server's processing ceiling frees the slot eventually
                error!(owner_id = %owner_id, error = %e, "Failed to release processing slot");
            }
        }
    }

    async fn leave_quietly(&self, owner_id: &str, queue_item_id: &str) {
        match self.gateway.leave(owner_id, queue_item_id).await {
            Ok(outcome) => {
                debug!(queue_item_id = %queue_item_id, removed = outcome.removed, "Left queue");
            }
            Err(e) => {
                warn!(queue_item_id = %queue_item_id, error = %e, "Failed to leave queue");
            }
        }
    }

    /// Poll again after the poll interval, or sooner when our turn comes first
    fn next_check(&self, status: &QueueStatus) -> Duration {
        match status.estimated_wait {
            WaitEstimate::Known(ms) if status.position == 1 => {
                self.config.poll_interval.min(Duration::from_millis(ms.max(0) as u64))
            }
            _ => self.config.poll_interval,
        }
    }

    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        retry: &RetryPolicy,
        mut shutdown: Option<&mut ShutdownToken>,
        mut f: F,
    ) -> Result<T, CoordinatorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crate::error::Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    match retry.should_retry(attempt) {
                        RetryDecision::Retry(delay_ms) => {
                            warn!(
                                operation = operation,
                                attempt = attempt,
                                delay_ms = delay_ms,
                                error = %e,
                                "Queue call failed, retrying"
                            );
                            let delay = Duration::from_millis(delay_ms as u64);
                            match shutdown.as_deref_mut() {
                                Some(token) => sleep_or_cancel(delay, token).await?,
                                None => sleep(delay).await,
                            }
                        }
                        RetryDecision::GiveUp => return Err(CoordinatorError::Gateway(e)),
                    }
                }
                Err(e) => return Err(CoordinatorError::Gateway(e)),
            }
        }
    }

    fn emit(&self, event: CoordinatorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

async fn sleep_or_cancel(
    delay: Duration,
    shutdown: &mut ShutdownToken,
) -> Result<(), CoordinatorError> {
    if shutdown.is_shutdown() {
        return Err(CoordinatorError::Cancelled);
    }
    tokio::select! {
        _ = sleep(delay) => Ok(()),
        _ = shutdown.wait() => Err(CoordinatorError::Cancelled),
    }
}

fn panic_message(join_err: JoinError) -> String {
    if !join_err.is_panic() {
        return format!("pipeline task aborted: {}", join_err);
    }
    let payload = join_err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
