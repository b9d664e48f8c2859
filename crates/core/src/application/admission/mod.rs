// Admission Controller - public queue operations over a single critical section

pub mod config;
pub mod validation;

pub use config::AdmissionConfig;

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::application::estimator::estimate_wait;
use crate::domain::{
    ClaimRejection, CompleteOutcome, Fingerprint, JoinOutcome, LeaveOutcome, QueueItem,
    QueueStats, QueueStatus, QueueStore, RateWindow, Removal, StartOutcome,
};
use crate::error::{AppError, Result};
use crate::port::{AdmissionGateway, IdProvider, RateWindowRepository, TimeProvider};

/// Result of one liveness sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Occupant force-released for exceeding the processing ceiling
    pub reclaimed: Option<QueueItem>,
    /// Waiting items dropped for not polling
    pub evicted: Vec<QueueItem>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.reclaimed.is_none() && self.evicted.is_empty()
    }
}

/// Admission controller
///
/// Serializes every mutation of the queue through one mutex. No operation
/// awaits while holding it; the only I/O (rate window persistence) happens
/// after the guard is dropped.
pub struct AdmissionController {
    store: Mutex<QueueStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    rate_window_repo: Arc<dyn RateWindowRepository>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(
        config: AdmissionConfig,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        rate_window_repo: Arc<dyn RateWindowRepository>,
    ) -> Self {
        Self {
            store: Mutex::new(QueueStore::new(RateWindow::new(config.interval_ms))),
            id_provider,
            time_provider,
            rate_window_repo,
            config,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueStore>> {
        self.store
            .lock()
            .map_err(|_| AppError::Internal("queue state lock poisoned".to_string()))
    }

    /// Load the persisted rate window (call once at process start)
    pub async fn restore(&self) -> Result<Option<i64>> {
        let persisted = self.rate_window_repo.load().await?;
        if let Some(last_completed_at) = persisted {
            self.lock()?.restore_window(last_completed_at);
            info!(
                last_completed_at = last_completed_at,
                interval_ms = self.config.interval_ms,
                "Rate window restored"
            );
        }
        Ok(persisted)
    }

    /// Enqueue the caller, claiming the slot right away when nothing stands in the way
    pub async fn join(&self, owner_id: &str, fingerprint: Fingerprint) -> Result<JoinOutcome> {
        validation::validate_owner_id(owner_id)?;
        let now = self.time_provider.now_millis();

        let outcome = {
            let mut store = self.lock()?;
            let item = store.enqueue(self.id_provider.generate_id(), owner_id, fingerprint, now);
            let can_process = item.is_processing() || store.claim(&item.id, now).is_ok();
            JoinOutcome {
                can_process,
                status: status_in(&store, &item.id, now),
                queue_item_id: item.id,
            }
        };

        info!(
            queue_item_id = %outcome.queue_item_id,
            owner_id = %owner_id,
            can_process = outcome.can_process,
            position = outcome.status.position,
            "Joined admission queue"
        );
        Ok(outcome)
    }

    /// Position and wait estimate; unknown ids report `in_queue = false`
    pub async fn status(&self, queue_item_id: &str) -> Result<QueueStatus> {
        validation::validate_item_id(queue_item_id)?;
        let now = self.time_provider.now_millis();

        let mut store = self.lock()?;
        if !store.touch(queue_item_id, now) {
            debug!(queue_item_id = %queue_item_id, "Status for unknown queue item");
            return Ok(QueueStatus::not_in_queue(store.total_len()));
        }
        Ok(status_in(&store, queue_item_id, now))
    }

    /// Claim the processing slot for the caller's waiting item
    pub async fn start(&self, owner_id: &str) -> Result<StartOutcome> {
        validation::validate_owner_id(owner_id)?;
        let now = self.time_provider.now_millis();

        let mut store = self.lock()?;
        let claimed = if store.processing_item_of(owner_id).is_some() {
            Err(ClaimRejection::AlreadyProcessing)
        } else {
            match store.waiting_item_of(owner_id).map(|i| i.id.clone()) {
                Some(id) => store.claim(&id, now),
                None => Err(ClaimRejection::NotFound),
            }
        };

        match claimed {
            Ok(item) => {
                info!(
                    queue_item_id = %item.id,
                    owner_id = %owner_id,
                    waited_ms = now - item.submitted_at,
                    "Processing slot claimed"
                );
                Ok(StartOutcome::Started {
                    queue_item_id: item.id,
                })
            }
            Err(reason) => {
                let retry_after_ms = match reason {
                    ClaimRejection::RateWindowNotElapsed => store.window().remaining(now),
                    ClaimRejection::NotHead | ClaimRejection::SlotOccupied => {
                        self.config.retry_hint_ms
                    }
                    ClaimRejection::AlreadyProcessing | ClaimRejection::NotFound => 0,
                };
                debug!(
                    owner_id = %owner_id,
                    reason = %reason,
                    retry_after_ms = retry_after_ms,
                    "Start rejected"
                );
                Ok(StartOutcome::Rejected {
                    reason,
                    retry_after_ms,
                })
            }
        }
    }

    /// Release the caller's processing slot. Always succeeds.
    pub async fn complete(&self, owner_id: &str) -> Result<CompleteOutcome> {
        validation::validate_owner_id(owner_id)?;
        let now = self.time_provider.now_millis();

        let released = {
            let mut store = self.lock()?;
            match store.processing_item_of(owner_id).map(|i| i.id.clone()) {
                Some(id) => store.release(&id, now),
                None => None,
            }
        };

        match released {
            Some(item) => {
                info!(
                    queue_item_id = %item.id,
                    owner_id = %owner_id,
                    held_ms = item.claimed_at.map(|c| now - c),
                    "Processing slot released"
                );
                self.persist_completion(now).await;
                Ok(CompleteOutcome { released: true })
            }
            None => {
                debug!(owner_id = %owner_id, "Complete with no held slot (already released)");
                Ok(CompleteOutcome { released: false })
            }
        }
    }

    /// Drop the caller's item in whatever state it is in. Terminal no-op when absent.
    pub async fn leave(&self, owner_id: &str, queue_item_id: &str) -> Result<LeaveOutcome> {
        validation::validate_owner_id(owner_id)?;
        validation::validate_item_id(queue_item_id)?;
        let now = self.time_provider.now_millis();

        let removal = {
            let mut store = self.lock()?;
            let owned = store
                .find(queue_item_id)
                .map(|item| item.owner_id == owner_id);
            match owned {
                Some(true) => store.remove(queue_item_id, now),
                Some(false) => {
                    warn!(
                        queue_item_id = %queue_item_id,
                        owner_id = %owner_id,
                        "Leave for an item owned by someone else ignored"
                    );
                    Removal::Absent
                }
                None => Removal::Absent,
            }
        };

        match &removal {
            Removal::Dequeued(item) => {
                info!(queue_item_id = %item.id, owner_id = %owner_id, "Left queue");
            }
            Removal::Released(item) => {
                info!(
                    queue_item_id = %item.id,
                    owner_id = %owner_id,
                    "Left queue while processing, slot released"
                );
                self.persist_completion(now).await;
            }
            Removal::Absent => {
                debug!(queue_item_id = %queue_item_id, "Leave for unknown queue item");
            }
        }

        Ok(LeaveOutcome {
            removed: !removal.is_absent(),
        })
    }

    /// Admin snapshot
    pub fn stats(&self) -> Result<QueueStats> {
        let now = self.time_provider.now_millis();
        let store = self.lock()?;
        let window = store.window();
        Ok(QueueStats {
            waiting: store.waiting_len(),
            processing: store.slot().map(|i| i.id.clone()),
            processing_since: store.slot().and_then(|i| i.claimed_at),
            oldest_waiting_since: store.peek_head().map(|i| i.submitted_at),
            interval_ms: window.interval_ms,
            last_completed_at: window.last_completed_at,
            rate_window_remaining_ms: window.remaining(now),
        })
    }

    /// Liveness valve: reclaim a stuck slot and evict abandoned waiters
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.time_provider.now_millis();

        let report = {
            let mut store = self.lock()?;
            SweepReport {
                reclaimed: store.reclaim_stale_slot(now, self.config.processing_ceiling_ms),
                evicted: store.evict_idle_waiters(now, self.config.waiting_ttl_ms),
            }
        };

        if let Some(item) = &report.reclaimed {
            warn!(
                queue_item_id = %item.id,
                owner_id = %item.owner_id,
                claimed_at = ?item.claimed_at,
                ceiling_ms = self.config.processing_ceiling_ms,
                "Force-released stale processing slot"
            );
            self.persist_completion(now).await;
        }
        for item in &report.evicted {
            info!(
                queue_item_id = %item.id,
                owner_id = %item.owner_id,
                last_seen_at = item.last_seen_at,
                "Evicted idle waiting item"
            );
        }

        Ok(report)
    }

    async fn persist_completion(&self, completed_at: i64) {
        // The in-memory window is authoritative; persistence only guards restarts
        if let Err(e) = self.rate_window_repo.save(completed_at).await {
            warn!(error = %e, completed_at = completed_at, "Failed to persist rate window");
        }
    }
}

/// Build a status view for a known item (caller holds the lock)
fn status_in(store: &QueueStore, queue_item_id: &str, now_millis: i64) -> QueueStatus {
    match store.position_of(queue_item_id) {
        Some(position) => {
            let slot_occupied_by_other = position != 0 && !store.is_slot_free();
            QueueStatus {
                in_queue: true,
                position,
                total_in_queue: store.total_len(),
                estimated_wait: estimate_wait(
                    position,
                    slot_occupied_by_other,
                    store.window(),
                    now_millis,
                ),
                is_processing: position == 0,
            }
        }
        None => QueueStatus::not_in_queue(store.total_len()),
    }
}

#[async_trait]
impl AdmissionGateway for AdmissionController {
    async fn join(&self, owner_id: &str, fingerprint: &Fingerprint) -> Result<JoinOutcome> {
        AdmissionController::join(self, owner_id, fingerprint.clone()).await
    }

    async fn status(&self, queue_item_id: &str) -> Result<QueueStatus> {
        AdmissionController::status(self, queue_item_id).await
    }

    async fn start(&self, owner_id: &str) -> Result<StartOutcome> {
        AdmissionController::start(self, owner_id).await
    }

    async fn complete(&self, owner_id: &str) -> Result<CompleteOutcome> {
        AdmissionController::complete(self, owner_id).await
    }

    async fn leave(&self, owner_id: &str, queue_item_id: &str) -> Result<LeaveOutcome> {
        AdmissionController::leave(self, owner_id, queue_item_id).await
    }
}

#[cfg(test)]
mod tests;
