// Application Layer - Use Cases and Business Logic

pub mod admission;
pub mod constants;
pub mod coordinator;
pub mod estimator;
pub mod retry;
pub mod shutdown;
pub mod sweeper;

// Re-exports
pub use admission::{AdmissionConfig, AdmissionController, SweepReport};
pub use coordinator::{ClientCoordinator, CoordinatorConfig, CoordinatorError, CoordinatorEvent};
pub use estimator::{estimate_wait, is_ready};
pub use retry::{RetryDecision, RetryPolicy};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use sweeper::QueueSweeper;
