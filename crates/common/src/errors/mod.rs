//! Error types for the Twilog search core
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error kinds for different failure modes
//! - JSON-RPC error code mapping (not HTTP status codes - this service has no HTTP surface)
//! - Structured error objects for the wire protocol

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error kind, carrying the JSON-RPC numeric code it maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed frame: missing/wrong `jsonrpc` field.
    ProtocolInvalidRequest,
    /// Unknown RPC method.
    ProtocolMethodNotFound,
    /// Parameter binding failed.
    ProtocolInvalidParams,
    /// Business method called before `init_completed`.
    NotReady,
    /// Query empty after pipeline parse, or a vector part was required but absent.
    InvalidQuery,
    /// Requested scoring mode's backing store is absent.
    ModeUnavailable,
    /// A fusion mode was combined with a text-only query.
    HybridNotSupportedForTextOnly,
    /// `top_k`/`limit`/weight-list length outside allowed bounds.
    ValueOutOfRange,
    /// Fatal at load: duplicate id, shape mismatch, missing metadata.
    CorruptStore,
    /// Anything else (embedder transport failure, I/O, etc).
    Internal,
}

impl ErrorCode {
    /// JSON-RPC numeric code. The three protocol-level kinds use the reserved
    /// `-32xxx` range; everything else uses an application-specific code above it.
    pub fn as_rpc_code(&self) -> i64 {
        match self {
            ErrorCode::ProtocolInvalidRequest => -32600,
            ErrorCode::ProtocolMethodNotFound => -32601,
            ErrorCode::ProtocolInvalidParams => -32602,
            ErrorCode::Internal => -32603,
            ErrorCode::NotReady => -32000,
            ErrorCode::InvalidQuery => -32001,
            ErrorCode::ModeUnavailable => -32002,
            ErrorCode::HybridNotSupportedForTextOnly => -32003,
            ErrorCode::ValueOutOfRange => -32004,
            ErrorCode::CorruptStore => -32005,
        }
    }
}

/// Application error type for the whole search core.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Server not ready: initialisation incomplete")]
    NotReady,

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Mode unavailable: {mode} requires a store that is not loaded")]
    ModeUnavailable { mode: String },

    #[error("Hybrid scoring modes are not supported for text-only queries")]
    HybridNotSupportedForTextOnly,

    #[error("Value out of range: {message}")]
    ValueOutOfRange { message: String },

    #[error("Corrupt store: {message}")]
    CorruptStore { message: String },

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error kind/code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidRequest { .. } => ErrorCode::ProtocolInvalidRequest,
            AppError::MethodNotFound { .. } => ErrorCode::ProtocolMethodNotFound,
            AppError::InvalidParams { .. } => ErrorCode::ProtocolInvalidParams,
            AppError::NotReady => ErrorCode::NotReady,
            AppError::InvalidQuery { .. } => ErrorCode::InvalidQuery,
            AppError::ModeUnavailable { .. } => ErrorCode::ModeUnavailable,
            AppError::HybridNotSupportedForTextOnly => ErrorCode::HybridNotSupportedForTextOnly,
            AppError::ValueOutOfRange { .. } => ErrorCode::ValueOutOfRange,
            AppError::CorruptStore { .. } => ErrorCode::CorruptStore,
            AppError::Embedder(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::HttpClient(_)
            | AppError::Other(_) => ErrorCode::Internal,
        }
    }

    /// Whether this error is fatal to the daemon's startup (signals `init_error`).
    pub fn is_fatal_at_load(&self) -> bool {
        matches!(self.code(), ErrorCode::CorruptStore)
    }

    /// The JSON-RPC error object `{code, message}` for this error.
    pub fn to_rpc_error(&self) -> RpcErrorObject {
        if self.is_fatal_at_load() {
            tracing::error!(error = %self, code = ?self.code(), "fatal store error");
        } else {
            tracing::warn!(error = %self, code = ?self.code(), "request failed");
        }
        RpcErrorObject {
            code: self.code().as_rpc_code(),
            message: self.to_string(),
        }
    }
}

/// The `error` object of a JSON-RPC reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ModeUnavailable {
            mode: "average".into(),
        };
        assert_eq!(err.code(), ErrorCode::ModeUnavailable);
        assert_eq!(err.code().as_rpc_code(), -32002);
    }

    #[test]
    fn test_protocol_errors_use_reserved_range() {
        assert_eq!(ErrorCode::ProtocolInvalidRequest.as_rpc_code(), -32600);
        assert_eq!(ErrorCode::ProtocolMethodNotFound.as_rpc_code(), -32601);
        assert_eq!(ErrorCode::ProtocolInvalidParams.as_rpc_code(), -32602);
    }

    #[test]
    fn test_corrupt_store_is_fatal() {
        let err = AppError::CorruptStore {
            message: "duplicate id 5".into(),
        };
        assert!(err.is_fatal_at_load());
        let not_fatal = AppError::NotReady;
        assert!(!not_fatal.is_fatal_at_load());
    }
}
