//! RPC Messages
//!
//! JSON bodies exchanged between admins/clients and providers. Every response
//! is an [`RpcResponse`] envelope carrying a status, an optional message and
//! an optional result payload.

use crate::domain::ports::CollectorId;
use crate::error::{Error, Result, RpcStatus};
use serde::{Deserialize, Serialize};

// =============================================================================
// RPC Names
// =============================================================================

pub const RPC_CREATE_COLLECTOR: &str = "create_collector";
pub const RPC_OPEN_COLLECTOR: &str = "open_collector";
pub const RPC_CLOSE_COLLECTOR: &str = "close_collector";
pub const RPC_DESTROY_COLLECTOR: &str = "destroy_collector";
pub const RPC_LIST_COLLECTORS: &str = "list_collectors";
pub const RPC_HELLO: &str = "hello";
pub const RPC_SUM: &str = "sum";
pub const RPC_INVOKE: &str = "invoke";

/// Path of an RPC addressed to one provider
pub fn rpc_path(provider_id: u16, rpc: &str) -> String {
    format!("/v1/providers/{}/{}", provider_id, rpc)
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `create_collector` and `open_collector`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantiateRequest {
    /// Backend name
    #[serde(rename = "type")]
    pub backend: String,
    /// Backend-specific configuration, passed through verbatim
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `close_collector` and `destroy_collector`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorAdminRequest {
    pub id: CollectorId,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCollectorsRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub max_ids: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloRequest {
    pub id: CollectorId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumRequest {
    pub id: CollectorId,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub id: CollectorId,
    pub operation: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

// =============================================================================
// Replies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorIdReply {
    pub id: CollectorId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCollectorsReply {
    pub count: usize,
    pub ids: Vec<CollectorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumReply {
    pub result: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeReply {
    pub result: serde_json::Value,
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Status-carrying response of every RPC except `hello`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub status: RpcStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> RpcResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            status: RpcStatus::Success,
            message: None,
            result: Some(result),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self {
            status: err.status(),
            message: Some(err.to_string()),
            result: None,
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::from_error(&e),
        }
    }

    /// Turn a decoded response back into a `Result` on the calling side
    pub fn into_result(self) -> Result<Option<T>> {
        if self.status.is_success() {
            Ok(self.result)
        } else {
            Err(Error::from_status(self.status, self.message))
        }
    }
}
