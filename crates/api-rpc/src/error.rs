//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes. Scheduling conflicts
//! never get here; they are ordinary results.

use jsonrpsee::types::ErrorObjectOwned;
use vivid_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const THROTTLED: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::SYSTEM_ERROR, e.to_string(), None::<()>),
        AppError::Transport(msg) => ErrorObjectOwned::owned(code::SYSTEM_ERROR, msg, None::<()>),
        AppError::Config(msg) | AppError::Internal(msg) => {
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>)
        }
    }
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_4000() {
        let err = to_rpc_error(AppError::Validation("owner_id cannot be empty".into()));
        assert_eq!(err.code(), code::VALIDATION_ERROR);
        assert!(err.message().contains("owner_id"));
    }

    #[test]
    fn test_poisoned_lock_maps_to_internal() {
        let err = to_rpc_error(AppError::Internal("queue state lock poisoned".into()));
        assert_eq!(err.code(), code::INTERNAL_ERROR);
    }

    #[test]
    fn test_throttled_code() {
        assert_eq!(throttled().code(), code::THROTTLED);
    }
}
