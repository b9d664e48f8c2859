//! SDK Error Types

use thiserror::Error;
use vivid_core::error::AppError;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// Server-side error codes (see vivid-api-rpc)
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const THROTTLED: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        match e {
            jsonrpsee::core::ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            jsonrpsee::core::ClientError::Transport(e) => SdkError::Transport(e.to_string()),
            jsonrpsee::core::ClientError::RequestTimeout => {
                SdkError::Transport("Request timed out".to_string())
            }
            jsonrpsee::core::ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection restart needed".to_string())
            }
            jsonrpsee::core::ClientError::ParseError(e) => SdkError::Serialization(e),
            _ => SdkError::Other(e.to_string()),
        }
    }
}

/// Gateway view of SDK failures: anything a retry might fix is `Transport`
impl From<SdkError> for AppError {
    fn from(e: SdkError) -> Self {
        match e {
            SdkError::Connection(msg) | SdkError::Transport(msg) => AppError::Transport(msg),
            SdkError::Rpc { code, message } => match code {
                code::VALIDATION_ERROR => AppError::Validation(message),
                code::THROTTLED => AppError::Transport(format!("throttled: {}", message)),
                code::DB_ERROR => AppError::Database(message),
                _ => AppError::Internal(format!("RPC error ({}): {}", code, message)),
            },
            SdkError::Serialization(e) => AppError::Serialization(e),
            SdkError::Other(msg) => AppError::Internal(msg),
        }
    }
}
