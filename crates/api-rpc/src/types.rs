//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Field names are camelCase on
//! the wire; `estimatedWaitTime` is milliseconds with -1 meaning unknown.

use serde::{Deserialize, Serialize};
use vivid_core::domain::{
    ClaimRejection, JoinOutcome, QueueStats, QueueStatus, StartOutcome, WaitEstimate,
};

/// queue.check.v1 - Join the queue (or get the slot right away)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Precomputed content fingerprint; clients that already hashed the
    /// submission send this instead of the full text
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub can_process: bool,
    pub queue_item_id: String,
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait_time: WaitEstimate,
}

impl From<JoinOutcome> for CheckResponse {
    fn from(outcome: JoinOutcome) -> Self {
        Self {
            can_process: outcome.can_process,
            queue_item_id: outcome.queue_item_id,
            position: outcome.status.position,
            total_in_queue: outcome.status.total_in_queue,
            estimated_wait_time: outcome.status.estimated_wait,
        }
    }
}

/// queue.status.v1 - Position and wait estimate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub queue_item_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub in_queue: bool,
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait_time: WaitEstimate,
    pub is_processing: bool,
}

impl From<QueueStatus> for StatusResponse {
    fn from(status: QueueStatus) -> Self {
        Self {
            in_queue: status.in_queue,
            position: status.position,
            total_in_queue: status.total_in_queue,
            estimated_wait_time: status.estimated_wait,
            is_processing: status.is_processing,
        }
    }
}

/// queue.start.v1 - Claim the processing slot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClaimRejection>,
    /// Milliseconds until a retry makes sense
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

impl From<StartOutcome> for StartResponse {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started { queue_item_id } => Self {
                success: true,
                queue_item_id: Some(queue_item_id),
                error: None,
                retry_after: None,
            },
            StartOutcome::Rejected {
                reason,
                retry_after_ms,
            } => Self {
                success: false,
                queue_item_id: None,
                error: Some(reason),
                retry_after: Some(retry_after_ms),
            },
        }
    }
}

/// queue.complete.v1 - Release the slot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    /// Always true: completion is idempotent
    pub success: bool,
    /// Whether this call actually freed the slot
    pub released: bool,
}

/// queue.leave.v1 - Abandon a queue item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub owner_id: String,
    pub queue_item_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub success: bool,
    pub removed: bool,
}

/// admin.stats.v1 - Queue counters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub waiting: usize,
    pub processing: Option<String>,
    pub processing_since: Option<i64>,
    pub oldest_waiting_since: Option<i64>,
    pub interval_ms: i64,
    pub last_completed_at: Option<i64>,
    pub rate_window_remaining_ms: i64,
    pub rate_limit_tokens: u32,
    pub uptime_seconds: i64,
}

impl StatsResponse {
    pub fn new(stats: QueueStats, rate_limit_tokens: u32, uptime_seconds: i64) -> Self {
        Self {
            waiting: stats.waiting,
            processing: stats.processing,
            processing_since: stats.processing_since,
            oldest_waiting_since: stats.oldest_waiting_since,
            interval_ms: stats.interval_ms,
            last_completed_at: stats.last_completed_at,
            rate_window_remaining_ms: stats.rate_window_remaining_ms,
            rate_limit_tokens,
            uptime_seconds,
        }
    }
}
