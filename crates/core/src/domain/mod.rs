// Domain Layer - Pure business logic and entities

pub mod admission;
pub mod error;
pub mod queue_item;
pub mod queue_store;
pub mod rate_window;

// Re-exports
pub use admission::{
    ClaimRejection, CompleteOutcome, JoinOutcome, LeaveOutcome, QueueStats, QueueStatus,
    StartOutcome, WaitEstimate,
};
pub use error::DomainError;
pub use queue_item::{Fingerprint, ItemState, OwnerId, QueueItem, QueueItemId};
pub use queue_store::{QueueStore, Removal};
pub use rate_window::RateWindow;
