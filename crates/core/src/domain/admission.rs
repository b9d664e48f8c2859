// Admission Outcomes - results of the public queue operations

use serde::{Deserialize, Serialize};

use crate::domain::queue_item::QueueItemId;

/// Estimated wait before a caller may start.
///
/// On the wire this is a plain millisecond count with `-1` standing for
/// `Unknown`, which is what existing clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", from = "i64")]
pub enum WaitEstimate {
    /// Known upper bound in milliseconds
    Known(i64),
    /// Blocked behind a job whose duration depends on the external pipeline
    Unknown,
}

impl WaitEstimate {
    pub const UNKNOWN_SENTINEL: i64 = -1;

    pub fn known(ms: i64) -> Self {
        WaitEstimate::Known(ms.max(0))
    }

    pub fn as_millis(&self) -> Option<i64> {
        match self {
            WaitEstimate::Known(ms) => Some(*ms),
            WaitEstimate::Unknown => None,
        }
    }
}

impl From<WaitEstimate> for i64 {
    fn from(estimate: WaitEstimate) -> Self {
        match estimate {
            WaitEstimate::Known(ms) => ms,
            WaitEstimate::Unknown => WaitEstimate::UNKNOWN_SENTINEL,
        }
    }
}

impl From<i64> for WaitEstimate {
    fn from(ms: i64) -> Self {
        if ms < 0 {
            WaitEstimate::Unknown
        } else {
            WaitEstimate::Known(ms)
        }
    }
}

/// Why a claim on the processing slot was refused.
///
/// All variants are transient scheduling facts, not caller errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimRejection {
    /// Another item is ahead in the waiting sequence
    NotHead,
    /// Someone else holds the processing slot
    SlotOccupied,
    /// The provider's rate window has not elapsed yet
    RateWindowNotElapsed,
    /// The caller already holds the slot (duplicate start)
    AlreadyProcessing,
    /// The caller has no waiting item (membership lost)
    NotFound,
}

impl std::fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimRejection::NotHead => write!(f, "NOT_HEAD"),
            ClaimRejection::SlotOccupied => write!(f, "SLOT_OCCUPIED"),
            ClaimRejection::RateWindowNotElapsed => write!(f, "RATE_WINDOW_NOT_ELAPSED"),
            ClaimRejection::AlreadyProcessing => write!(f, "ALREADY_PROCESSING"),
            ClaimRejection::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// Caller's view of its queue membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub in_queue: bool,
    /// 0 = holding the processing slot, otherwise 1-based waiting rank
    pub position: usize,
    pub total_in_queue: usize,
    pub estimated_wait: WaitEstimate,
    pub is_processing: bool,
}

impl QueueStatus {
    /// Membership lost (evicted, expired, restarted or never existed)
    pub fn not_in_queue(total_in_queue: usize) -> Self {
        Self {
            in_queue: false,
            position: 0,
            total_in_queue,
            estimated_wait: WaitEstimate::Unknown,
            is_processing: false,
        }
    }
}

/// Result of `join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Slot was claimed on the caller's behalf; run the pipeline now
    pub can_process: bool,
    pub queue_item_id: QueueItemId,
    pub status: QueueStatus,
}

/// Result of `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOutcome {
    Started {
        queue_item_id: QueueItemId,
    },
    Rejected {
        reason: ClaimRejection,
        retry_after_ms: i64,
    },
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started { .. })
    }
}

/// Result of `complete` (always a success)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteOutcome {
    /// False when the slot had already been released (duplicate call)
    pub released: bool,
}

/// Result of `leave` (always a success)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveOutcome {
    pub removed: bool,
}

/// Admin snapshot of the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub processing: Option<QueueItemId>,
    pub processing_since: Option<i64>,
    pub oldest_waiting_since: Option<i64>,
    pub interval_ms: i64,
    pub last_completed_at: Option<i64>,
    pub rate_window_remaining_ms: i64,
}
