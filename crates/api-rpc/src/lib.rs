//! JSON-RPC API Layer
//!
//! Exposes the admission controller as JSON-RPC 2.0 methods
//! (`queue.*.v1`, `admin.stats.v1`). Payloads are camelCase.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use rate_limiter::RateLimiter;
pub use server::{RpcServer, RpcServerConfig};
