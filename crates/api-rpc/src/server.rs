//! JSON-RPC Server
//!
//! Serves the queue over JSON-RPC 2.0 on TCP. Binds to localhost by default.

use crate::handler::RpcHandler;
use crate::types::{CheckRequest, CompleteRequest, LeaveRequest, StartRequest, StatusRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use vivid_core::error::{AppError, Result};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9627;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port (tests)
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    /// Bind and start serving; returns the bound address and a stop handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Transport(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let module = self.build_module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }

    fn build_module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("queue.check.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CheckRequest = params.parse()?;
                    handler.check(req).await
                }
            })
            .map_err(register_error)?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StatusRequest = params.parse()?;
                    handler.status(req).await
                }
            })
            .map_err(register_error)?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.start.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StartRequest = params.parse()?;
                    handler.start(req).await
                }
            })
            .map_err(register_error)?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.complete.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CompleteRequest = params.parse()?;
                    handler.complete(req).await
                }
            })
            .map_err(register_error)?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.leave.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: LeaveRequest = params.parse()?;
                    handler.leave(req).await
                }
            })
            .map_err(register_error)?;

        // Admin APIs
        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(register_error)?;

        Ok(module)
    }
}

fn register_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("Failed to register RPC method: {}", e))
}
