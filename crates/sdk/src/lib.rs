//! Vivid Queue SDK - Rust Client Library
//!
//! Talks to the `vivid-queued` daemon over JSON-RPC. [`VividQueueClient`]
//! implements `AdmissionGateway`, so it plugs straight into
//! `ClientCoordinator` for the full join / wait / start / complete cycle.
//!
//! # Example
//!
//! ```no_run
//! use vivid_queue_sdk::VividQueueClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VividQueueClient::connect("http://127.0.0.1:9627").await?;
//!
//!     let joined = client.check("user-42", "Northern lights", "Aurora over the fjord").await?;
//!     if joined.can_process {
//!         // run the generation, then release the slot
//!         client.complete("user-42").await?;
//!     } else {
//!         let status = client.status(&joined.queue_item_id).await?;
//!         println!("position {} of {}", status.position, status.total_in_queue);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::VividQueueClient;
pub use error::{Result, SdkError};
pub use types::{
    CheckResponse, CompleteResponse, LeaveResponse, StartResponse, StatsResponse, StatusResponse,
};
