//! Provider Endpoint Server
//!
//! Serves the RPC router for every provider of a [`ProviderSet`] on one
//! listening address. Shutdown is graceful: in-flight requests complete, then
//! every provider closes its remaining collectors.

use crate::error::{Error, Result};
use crate::provider::ProviderSet;
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use super::rpc::RpcRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the endpoint server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// Endpoint server hosting a set of providers
pub struct ApiServer {
    config: ApiServerConfig,
    providers: Arc<ProviderSet>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, providers: Arc<ProviderSet>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            providers,
            shutdown_tx,
        }
    }

    pub fn providers(&self) -> &Arc<ProviderSet> {
        &self.providers
    }

    /// Bind the configured address and serve until shut down
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr).await.map_err(|e| {
            Error::Internal(format!("Failed to bind {}: {}", self.config.addr, e))
        })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shut down
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let app = RpcRouter::new(self.providers.clone())
            .build()
            .layer(DefaultBodyLimit::max(self.config.max_body_size));

        info!("Collector provider endpoint listening on {}", local_addr);
        info!("  Providers: {:?}", self.providers.ids());

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Endpoint shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("Endpoint server error: {}", e)))?;

        let closed = self.providers.shutdown().await;
        info!(closed, "Endpoint finalized");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Serve `providers` on an ephemeral loopback port for tests
#[cfg(test)]
pub(crate) async fn spawn_loopback(
    providers: Arc<ProviderSet>,
) -> (SocketAddr, Arc<ApiServer>, tokio::task::JoinHandle<Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(ApiServer::new(ApiServerConfig::default(), providers));
    let runner = server.clone();
    let handle = tokio::spawn(async move { runner.serve(listener).await });
    (addr, server, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderConfig;

    #[test]
    fn test_default_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.addr.port(), 8090);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_shutdown_closes_collectors() {
        let providers = ProviderSet::from_configs(&[ProviderConfig::default()]).unwrap();
        let provider = providers.get(0).unwrap();
        provider.create_collector(None, "dummy", None).await.unwrap();

        let (addr, server, handle) = spawn_loopback(providers).await;
        let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert!(health.status().is_success());

        server.shutdown();
        handle.await.unwrap().unwrap();
        assert!(provider.collectors().is_empty());
    }
}
