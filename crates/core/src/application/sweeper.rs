// Queue Sweeper - periodic liveness sweep over the admission controller
// Reclaims a processing slot held past the ceiling and evicts waiters that
// stopped polling, so one dead client can never stall the queue.

use crate::application::admission::{AdmissionController, SweepReport};
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Sweep scheduler
///
/// Runs `AdmissionController::sweep` on a fixed interval in the background
pub struct QueueSweeper {
    controller: Arc<AdmissionController>,
    every: Duration,
}

impl QueueSweeper {
    pub fn new(controller: Arc<AdmissionController>, every: Duration) -> Self {
        Self { controller, every }
    }

    /// Run the sweep loop until shutdown (spawn with tokio::spawn)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_ms = self.every.as_millis() as u64,
            processing_ceiling_ms = self.controller.config().processing_ceiling_ms,
            waiting_ttl_ms = self.controller.config().waiting_ttl_ms,
            "Queue sweeper started"
        );

        let mut tick = interval(self.every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = ?e, "Queue sweep failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Queue sweeper stopped");
                    break;
                }
            }
        }
    }

    /// Run one sweep immediately
    pub async fn run_once(&self) -> Result<SweepReport> {
        let report = self.controller.sweep().await?;
        if report.is_empty() {
            debug!("Queue sweep: nothing to do");
        } else {
            info!(
                reclaimed = report.reclaimed.is_some(),
                evicted = report.evicted.len(),
                "Queue sweep completed"
            );
        }
        Ok(report)
    }
}
