//! Admin client
//!
//! Issues the privileged lifecycle RPCs against providers. Every call carries
//! the admin token, which the provider checks before touching its table.

use super::transport::{ProviderHandle, RpcTransport, DEFAULT_TIMEOUT_MS};
use crate::api::messages::*;
use crate::domain::ports::CollectorId;
use crate::error::Result;
use tracing::info;

/// Client for collector administration
#[derive(Debug, Clone)]
pub struct AdminClient {
    transport: RpcTransport,
}

impl AdminClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(RpcTransport::new(DEFAULT_TIMEOUT_MS)?))
    }

    pub fn with_transport(transport: RpcTransport) -> Self {
        Self { transport }
    }

    /// Create a collector of type `backend` and return its id
    pub async fn create_collector(
        &self,
        provider: &ProviderHandle,
        token: Option<&str>,
        backend: &str,
        config: Option<&str>,
    ) -> Result<CollectorId> {
        let request = InstantiateRequest {
            backend: backend.to_string(),
            config: config.map(str::to_string),
            token: token.map(str::to_string),
        };
        let reply: CollectorIdReply = self
            .transport
            .call_for(provider, RPC_CREATE_COLLECTOR, &request)
            .await?;
        info!(provider = %provider, collector = %reply.id, backend, "Created collector");
        Ok(reply.id)
    }

    /// Attach a collector of type `backend` to existing state
    pub async fn open_collector(
        &self,
        provider: &ProviderHandle,
        token: Option<&str>,
        backend: &str,
        config: Option<&str>,
    ) -> Result<CollectorId> {
        let request = InstantiateRequest {
            backend: backend.to_string(),
            config: config.map(str::to_string),
            token: token.map(str::to_string),
        };
        let reply: CollectorIdReply = self
            .transport
            .call_for(provider, RPC_OPEN_COLLECTOR, &request)
            .await?;
        info!(provider = %provider, collector = %reply.id, backend, "Opened collector");
        Ok(reply.id)
    }

    pub async fn close_collector(
        &self,
        provider: &ProviderHandle,
        token: Option<&str>,
        id: CollectorId,
    ) -> Result<()> {
        let request = CollectorAdminRequest {
            id,
            token: token.map(str::to_string),
        };
        self.transport
            .call::<_, ()>(provider, RPC_CLOSE_COLLECTOR, &request)
            .await?;
        Ok(())
    }

    pub async fn destroy_collector(
        &self,
        provider: &ProviderHandle,
        token: Option<&str>,
        id: CollectorId,
    ) -> Result<()> {
        let request = CollectorAdminRequest {
            id,
            token: token.map(str::to_string),
        };
        self.transport
            .call::<_, ()>(provider, RPC_DESTROY_COLLECTOR, &request)
            .await?;
        Ok(())
    }

    /// Up to `max_ids` collector ids, oldest first
    pub async fn list_collectors(
        &self,
        provider: &ProviderHandle,
        token: Option<&str>,
        max_ids: usize,
    ) -> Result<Vec<CollectorId>> {
        let request = ListCollectorsRequest {
            token: token.map(str::to_string),
            max_ids,
        };
        let reply: ListCollectorsReply = self
            .transport
            .call_for(provider, RPC_LIST_COLLECTORS, &request)
            .await?;
        Ok(reply.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::spawn_loopback;
    use crate::error::{Error, RpcStatus};
    use crate::provider::{ProviderConfig, ProviderSet};
    use assert_matches::assert_matches;
    use std::collections::HashSet;
    use std::sync::Arc;

    const TOKEN: &str = "ABCDEFGH";

    async fn setup() -> (AdminClient, ProviderHandle, Arc<ProviderSet>) {
        let providers = ProviderSet::from_configs(&[ProviderConfig {
            provider_id: 42,
            token: Some(TOKEN.into()),
            pool_size: 8,
        }])
        .unwrap();
        let (addr, _server, _handle) = spawn_loopback(providers.clone()).await;
        (
            AdminClient::new().unwrap(),
            ProviderHandle::new(&addr.to_string(), 42),
            providers,
        )
    }

    fn remote_status(result: Result<impl std::fmt::Debug>) -> RpcStatus {
        match result {
            Err(Error::Remote { status, .. }) => status,
            other => panic!("expected a remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_list_destroy() {
        let (admin, provider, _) = setup().await;

        let id = admin
            .create_collector(&provider, Some(TOKEN), "dummy", None)
            .await
            .unwrap();
        let ids = admin
            .list_collectors(&provider, Some(TOKEN), 16)
            .await
            .unwrap();
        assert_eq!(ids, vec![id]);

        admin
            .destroy_collector(&provider, Some(TOKEN), id)
            .await
            .unwrap();
        assert_eq!(
            remote_status(admin.destroy_collector(&provider, Some(TOKEN), id).await),
            RpcStatus::InvalidCollector
        );
        assert!(admin
            .list_collectors(&provider, Some(TOKEN), 16)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_wrong_token_leaves_table_unchanged() {
        let (admin, provider, providers) = setup().await;
        admin
            .create_collector(&provider, Some(TOKEN), "dummy", None)
            .await
            .unwrap();

        assert_eq!(
            remote_status(
                admin
                    .create_collector(&provider, Some("qwerty"), "dummy", None)
                    .await
            ),
            RpcStatus::InvalidToken
        );
        assert_eq!(
            remote_status(admin.list_collectors(&provider, None, 16).await),
            RpcStatus::InvalidToken
        );
        assert_eq!(providers.get(42).unwrap().collectors().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_backend_and_config() {
        let (admin, provider, _) = setup().await;
        assert_eq!(
            remote_status(
                admin
                    .create_collector(&provider, Some(TOKEN), "blah", None)
                    .await
            ),
            RpcStatus::InvalidBackend
        );
        assert_eq!(
            remote_status(
                admin
                    .open_collector(&provider, Some(TOKEN), "dummy", Some("{ashqw{"))
                    .await
            ),
            RpcStatus::InvalidConfig
        );
    }

    #[tokio::test]
    async fn test_open_then_close() {
        let (admin, provider, _) = setup().await;
        let id = admin
            .open_collector(&provider, Some(TOKEN), "dummy", Some(r#"{"path": "/tmp/c"}"#))
            .await
            .unwrap();
        admin
            .close_collector(&provider, Some(TOKEN), id)
            .await
            .unwrap();
        assert_matches!(
            admin.close_collector(&provider, Some(TOKEN), id).await,
            Err(Error::Remote { status: RpcStatus::InvalidCollector, .. })
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_id() {
        let (admin, provider, _) = setup().await;
        let elsewhere = ProviderHandle::new(provider.base_url(), 7);
        assert_eq!(
            remote_status(
                admin
                    .create_collector(&elsewhere, Some(TOKEN), "dummy", None)
                    .await
            ),
            RpcStatus::InvalidProvider
        );
    }

    #[tokio::test]
    async fn test_parallel_creates() {
        let (admin, provider, providers) = setup().await;
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let admin = admin.clone();
                let provider = provider.clone();
                tokio::spawn(async move {
                    admin
                        .create_collector(&provider, Some(TOKEN), "dummy", None)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(providers.get(42).unwrap().collectors().len(), 32);
        assert_eq!(
            admin
                .list_collectors(&provider, Some(TOKEN), 64)
                .await
                .unwrap()
                .len(),
            32
        );
    }
}
