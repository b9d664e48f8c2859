//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate (camelCase on the wire).

use serde::{Deserialize, Serialize};
use vivid_core::domain::{ClaimRejection, JoinOutcome, QueueStatus, StartOutcome, WaitEstimate};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckRequest<'a> {
    pub owner_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<&'a str>,
}

/// Response from queue.check.v1
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub can_process: bool,
    pub queue_item_id: String,
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait_time: WaitEstimate,
}

impl From<CheckResponse> for JoinOutcome {
    fn from(r: CheckResponse) -> Self {
        JoinOutcome {
            can_process: r.can_process,
            status: QueueStatus {
                in_queue: true,
                position: r.position,
                total_in_queue: r.total_in_queue,
                estimated_wait: r.estimated_wait_time,
                is_processing: r.can_process,
            },
            queue_item_id: r.queue_item_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusRequest<'a> {
    pub queue_item_id: &'a str,
}

/// Response from queue.status.v1
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub in_queue: bool,
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait_time: WaitEstimate,
    pub is_processing: bool,
}

impl From<StatusResponse> for QueueStatus {
    fn from(r: StatusResponse) -> Self {
        QueueStatus {
            in_queue: r.in_queue,
            position: r.position,
            total_in_queue: r.total_in_queue,
            estimated_wait: r.estimated_wait_time,
            is_processing: r.is_processing,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OwnerRequest<'a> {
    pub owner_id: &'a str,
}

/// Response from queue.start.v1
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub queue_item_id: Option<String>,
    #[serde(default)]
    pub error: Option<ClaimRejection>,
    #[serde(default)]
    pub retry_after: Option<i64>,
}

impl StartResponse {
    /// Back to the domain outcome; a malformed success without an id is
    /// treated as a lost membership
    pub fn into_outcome(self) -> StartOutcome {
        match (self.success, self.queue_item_id) {
            (true, Some(queue_item_id)) => StartOutcome::Started { queue_item_id },
            _ => StartOutcome::Rejected {
                reason: self.error.unwrap_or(ClaimRejection::NotFound),
                retry_after_ms: self.retry_after.unwrap_or(0),
            },
        }
    }
}

/// Response from queue.complete.v1
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub success: bool,
    #[serde(default)]
    pub released: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LeaveRequest<'a> {
    pub owner_id: &'a str,
    pub queue_item_id: &'a str,
}

/// Response from queue.leave.v1
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub success: bool,
    pub removed: bool,
}

/// Response from admin.stats.v1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_sentinel_becomes_unknown() {
        let status: StatusResponse = serde_json::from_value(json!({
            "inQueue": true,
            "position": 2,
            "totalInQueue": 3,
            "estimatedWaitTime": -1,
            "isProcessing": false
        }))
        .unwrap();
        let status: QueueStatus = status.into();
        assert_eq!(status.estimated_wait, WaitEstimate::Unknown);
    }

    #[test]
    fn test_rejected_start_into_outcome() {
        let response: StartResponse = serde_json::from_value(json!({
            "success": false,
            "error": "RATE_WINDOW_NOT_ELAPSED",
            "retryAfter": 4000
        }))
        .unwrap();
        assert_eq!(
            response.into_outcome(),
            StartOutcome::Rejected {
                reason: ClaimRejection::RateWindowNotElapsed,
                retry_after_ms: 4000,
            }
        );
    }

    #[test]
    fn test_check_request_omits_absent_fields() {
        let req = CheckRequest {
            owner_id: "u1",
            title: None,
            content: None,
            fingerprint: Some("fp"),
        };
        assert_eq!(
            serde_json::to_value(req).unwrap(),
            json!({"ownerId": "u1", "fingerprint": "fp"})
        );
    }
}
