//! Error types for the collector provider
//!
//! Every error maps onto exactly one wire [`RpcStatus`], which is what a
//! provider puts in its responses and what clients decode back into
//! [`Error::Remote`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Wire Status
// =============================================================================

/// Status code carried by every RPC response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcStatus {
    Success,
    /// Allocation failure
    Allocation,
    /// Invalid argument
    InvalidArgs,
    /// Invalid provider id
    InvalidProvider,
    /// Invalid collector id
    InvalidCollector,
    /// Invalid backend type
    InvalidBackend,
    /// Invalid configuration
    InvalidConfig,
    /// Invalid token
    InvalidToken,
    /// Transport or decoding failure
    FromTransport,
    /// Unsupported operation
    OpUnsupported,
    /// Forbidden operation
    OpForbidden,
    /// Anything else
    Other,
}

impl RpcStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RpcStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcStatus::Success => "success",
            RpcStatus::Allocation => "allocation",
            RpcStatus::InvalidArgs => "invalid_args",
            RpcStatus::InvalidProvider => "invalid_provider",
            RpcStatus::InvalidCollector => "invalid_collector",
            RpcStatus::InvalidBackend => "invalid_backend",
            RpcStatus::InvalidConfig => "invalid_config",
            RpcStatus::InvalidToken => "invalid_token",
            RpcStatus::FromTransport => "from_transport",
            RpcStatus::OpUnsupported => "op_unsupported",
            RpcStatus::OpForbidden => "op_forbidden",
            RpcStatus::Other => "other",
        }
    }
}

impl std::fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error
// =============================================================================

/// Unified error type for providers, backends and clients
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgs(String),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Invalid provider: {provider_id}")]
    InvalidProvider { provider_id: u16 },

    #[error("Provider already registered: {provider_id}")]
    ProviderAlreadyRegistered { provider_id: u16 },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Provider is shutting down")]
    TableClosed,

    #[error("Operation forbidden: {0}")]
    OpForbidden(String),

    // =========================================================================
    // Collector Errors
    // =========================================================================
    #[error("Collector not found: {id}")]
    CollectorNotFound { id: String },

    #[error("Collector already exists: {id}")]
    CollectorExists { id: String },

    #[error("Invalid collector id: {0}")]
    InvalidCollectorId(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Backend not found: {backend}")]
    BackendNotFound { backend: String },

    #[error("Backend already registered: {backend}")]
    BackendAlreadyRegistered { backend: String },

    #[error("Invalid configuration for backend {backend}: {reason}")]
    InvalidConfig { backend: String, reason: String },

    #[error("Operation {operation} not supported by backend {backend}")]
    OpUnsupported { backend: String, operation: String },

    #[error("Backend operation failed: {backend} - {operation}: {reason}")]
    BackendOperationFailed {
        backend: String,
        operation: String,
        reason: String,
    },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed request or response: {0}")]
    Protocol(String),

    #[error("Remote call failed with status {status}: {message}")]
    Remote { status: RpcStatus, message: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wire status reported for this error
    pub fn status(&self) -> RpcStatus {
        match self {
            Error::Allocation(_) => RpcStatus::Allocation,

            Error::InvalidArgs(_)
            | Error::InvalidCollectorId(_)
            | Error::Configuration(_) => RpcStatus::InvalidArgs,

            Error::InvalidProvider { .. }
            | Error::ProviderAlreadyRegistered { .. }
            | Error::TableClosed => RpcStatus::InvalidProvider,

            Error::CollectorNotFound { .. } | Error::CollectorExists { .. } => {
                RpcStatus::InvalidCollector
            }

            Error::BackendNotFound { .. } | Error::BackendAlreadyRegistered { .. } => {
                RpcStatus::InvalidBackend
            }

            Error::InvalidConfig { .. } => RpcStatus::InvalidConfig,
            Error::InvalidToken => RpcStatus::InvalidToken,
            Error::OpUnsupported { .. } => RpcStatus::OpUnsupported,
            Error::OpForbidden(_) => RpcStatus::OpForbidden,

            Error::Transport(_) | Error::Protocol(_) => RpcStatus::FromTransport,

            Error::Remote { status, .. } => *status,

            Error::Internal(_)
            | Error::BackendOperationFailed { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_)
            | Error::Io(_) => RpcStatus::Other,
        }
    }

    /// Build the client-side error for a non-success response
    pub fn from_status(status: RpcStatus, message: Option<String>) -> Self {
        Error::Remote {
            status,
            message: message.unwrap_or_else(|| status.to_string()),
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type alias for the collector provider
pub type Result<T> = std::result::Result<T, Error>;
