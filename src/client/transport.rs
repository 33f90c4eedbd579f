//! Client transport
//!
//! Thin JSON-over-HTTP layer shared by the admin and the collector client.

use crate::api::messages::{rpc_path, RpcResponse};
use crate::error::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Provider Handle
// =============================================================================

/// Address of one provider: an endpoint plus the provider id on it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderHandle {
    base_url: String,
    provider_id: u16,
}

impl ProviderHandle {
    /// `address` may be `host:port` or a full `http(s)://` URL
    pub fn new(address: &str, provider_id: u16) -> Self {
        let address = address.trim().trim_end_matches('/');
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        Self {
            base_url,
            provider_id,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn provider_id(&self) -> u16 {
        self.provider_id
    }

    /// URL of `rpc` on this provider
    pub fn url(&self, rpc: &str) -> String {
        format!("{}{}", self.base_url, rpc_path(self.provider_id, rpc))
    }
}

impl std::fmt::Display for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.base_url, self.provider_id)
    }
}

// =============================================================================
// RPC Transport
// =============================================================================

/// Issues RPCs and decodes their response envelopes
#[derive(Debug, Clone)]
pub struct RpcTransport {
    http: reqwest::Client,
}

impl RpcTransport {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Send a request and wait for its result. A non-success status comes
    /// back as [`Error::Remote`].
    pub async fn call<Req, T>(&self, provider: &ProviderHandle, rpc: &str, request: &Req) -> Result<Option<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(provider.url(rpc)).json(request).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::Protocol(format!(
                "{} answered {} to {}",
                provider,
                response.status(),
                rpc
            )));
        }
        let envelope: RpcResponse<T> = response.json().await?;
        debug!(provider = %provider, rpc, status = %envelope.status, "RPC completed");
        envelope.into_result()
    }

    /// Like [`call`](Self::call) for RPCs that must carry a result
    pub async fn call_for<Req, T>(&self, provider: &ProviderHandle, rpc: &str, request: &Req) -> Result<T>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(provider, rpc, request)
            .await?
            .ok_or_else(|| Error::Protocol(format!("{} reply carries no result", rpc)))
    }

    /// Send a request without waiting for it to be handled
    pub async fn notify<Req>(&self, provider: &ProviderHandle, rpc: &str, request: &Req) -> Result<()>
    where
        Req: Serialize + ?Sized,
    {
        let response = self.http.post(provider.url(rpc)).json(request).send().await?;
        if !response.status().is_success() {
            return Err(Error::Protocol(format!(
                "{} answered {} to {}",
                provider,
                response.status(),
                rpc
            )));
        }
        Ok(())
    }
}
