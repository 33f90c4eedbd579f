//! Collector Provider
//!
//! The server-side actor owning one collector table and one backend registry.
//! Every entry point here is a complete request handler minus the transport:
//! authorize (admin operations only), dispatch, return a typed result.

use super::auth::AdminToken;
use super::metrics;
use super::pool::{WorkerPool, DEFAULT_POOL_SIZE};
use super::registry::BackendRegistry;
use super::table::{Collector, CollectorTable};
use crate::backends::BackendFactory;
use crate::domain::ports::{CollectorBackend, CollectorId, CollectorInstanceRef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Index distinguishing providers sharing one endpoint
    pub provider_id: u16,
    /// Admin token; `None` or empty disables the check
    pub token: Option<String>,
    /// Number of concurrently running handlers
    pub pool_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_id: 0,
            token: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Which backend entry point instantiates a collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Instantiate {
    Create,
    Open,
}

impl Instantiate {
    fn rpc(&self) -> &'static str {
        match self {
            Instantiate::Create => "create_collector",
            Instantiate::Open => "open_collector",
        }
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Server-side owner of collectors for one provider id
pub struct Provider {
    provider_id: u16,
    token: AdminToken,
    backends: BackendRegistry,
    collectors: CollectorTable,
    pool: WorkerPool,
}

impl Provider {
    /// Create a provider with the built-in `dummy` backend registered
    pub fn new(config: ProviderConfig) -> Arc<Self> {
        info!(provider_id = config.provider_id, "Registering collector provider");

        let provider = Self {
            provider_id: config.provider_id,
            token: AdminToken::new(config.token),
            backends: BackendRegistry::new(),
            collectors: CollectorTable::with_gauge(metrics::live_collectors_gauge(
                config.provider_id,
            )),
            pool: WorkerPool::new(config.pool_size),
        };
        for name in BackendFactory::builtin_names() {
            if let Some(backend) = BackendFactory::create(name) {
                if let Err(e) = provider.backends.register(backend) {
                    warn!(backend = *name, error = %e, "Could not register built-in backend");
                }
            }
        }

        info!(
            provider_id = provider.provider_id,
            pool_size = provider.pool.size(),
            token = provider.token.is_enabled(),
            "Collector provider registration done"
        );
        Arc::new(provider)
    }

    pub fn provider_id(&self) -> u16 {
        self.provider_id
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn collectors(&self) -> &CollectorTable {
        &self.collectors
    }

    /// Make another backend type available to admins
    pub fn register_backend(&self, backend: Arc<dyn CollectorBackend>) -> Result<()> {
        info!(
            provider_id = self.provider_id,
            backend = backend.name(),
            "Adding backend implementation to provider"
        );
        self.backends.register(backend)
    }

    fn authorize(&self, rpc: &str, token: Option<&str>) -> Result<()> {
        if self.token.check(token) {
            Ok(())
        } else {
            error!(provider_id = self.provider_id, rpc, "Invalid token");
            Err(Error::InvalidToken)
        }
    }

    // =========================================================================
    // Admin Operations
    // =========================================================================

    /// Instantiate new collector state with backend `backend`
    pub async fn create_collector(
        &self,
        token: Option<&str>,
        backend: &str,
        config: Option<&str>,
    ) -> Result<CollectorId> {
        self.instantiate(Instantiate::Create, token, backend, config)
            .await
    }

    /// Attach to existing external state with backend `backend`.
    /// A fresh id is minted every time.
    pub async fn open_collector(
        &self,
        token: Option<&str>,
        backend: &str,
        config: Option<&str>,
    ) -> Result<CollectorId> {
        self.instantiate(Instantiate::Open, token, backend, config)
            .await
    }

    async fn instantiate(
        &self,
        mode: Instantiate,
        token: Option<&str>,
        backend_name: &str,
        config: Option<&str>,
    ) -> Result<CollectorId> {
        self.authorize(mode.rpc(), token)?;
        if self.collectors.is_closed() {
            return Err(Error::TableClosed);
        }

        let backend = self.backends.find(backend_name).ok_or_else(|| {
            error!(backend = backend_name, "Could not find backend");
            Error::BackendNotFound {
                backend: backend_name.to_string(),
            }
        })?;

        let id = CollectorId::generate();
        let instance = match mode {
            Instantiate::Create => backend.create(config).await,
            Instantiate::Open => backend.open(config).await,
        }
        .map_err(|e| {
            error!(backend = backend_name, rpc = mode.rpc(), error = %e, "Backend failed to instantiate collector");
            e
        })?;
        let instance: CollectorInstanceRef = Arc::from(instance);

        if let Err(e) = self
            .collectors
            .insert(Collector::new(id, backend_name, instance.clone()))
        {
            if matches!(e, Error::TableClosed) {
                error!(provider_id = self.provider_id, rpc = mode.rpc(), "Provider finalized while instantiating collector");
            }
            if let Err(close_err) = instance.close().await {
                warn!(collector = %id, error = %close_err, "Failed to close unregistered collector");
            }
            return Err(e);
        }

        debug!(collector = %id, backend = backend_name, rpc = mode.rpc(), "Created collector");
        Ok(id)
    }

    /// Remove a collector, closing its instance
    pub async fn close_collector(&self, token: Option<&str>, id: CollectorId) -> Result<()> {
        self.authorize("close_collector", token)?;

        let result = self.collectors.remove(&id, true).await;
        match &result {
            Err(Error::CollectorNotFound { .. }) => {
                error!(collector = %id, "Could not find collector");
            }
            Err(e) => {
                error!(collector = %id, error = %e, "Collector removed but backend failed to close it");
            }
            Ok(()) => debug!(collector = %id, "Closed collector"),
        }
        result
    }

    /// Remove a collector and erase its backend state.
    ///
    /// The table entry is removed even when the backend fails to destroy the
    /// instance; that failure is only logged.
    pub async fn destroy_collector(&self, token: Option<&str>, id: CollectorId) -> Result<()> {
        self.authorize("destroy_collector", token)?;

        let collector = self.collectors.take(&id).ok_or_else(|| {
            error!(collector = %id, "Could not find collector");
            Error::CollectorNotFound { id: id.to_string() }
        })?;

        match collector.instance.destroy().await {
            Ok(()) => debug!(collector = %id, "Destroyed collector"),
            Err(e) => warn!(
                collector = %id,
                backend = %collector.backend,
                error = %e,
                "Could not destroy collector, backend state may be left invalid"
            ),
        }
        Ok(())
    }

    /// Up to `max_ids` collector ids, oldest first
    pub fn list_collectors(&self, token: Option<&str>, max_ids: usize) -> Result<Vec<CollectorId>> {
        self.authorize("list_collectors", token)?;
        let ids = self.collectors.list(max_ids);
        debug!(count = ids.len(), "Listed collectors");
        Ok(ids)
    }

    // =========================================================================
    // Collector Operations
    // =========================================================================

    fn find(&self, id: &CollectorId) -> Result<Arc<Collector>> {
        self.collectors.get(id).ok_or_else(|| {
            error!(collector = %id, "Could not find requested collector");
            Error::CollectorNotFound { id: id.to_string() }
        })
    }

    /// Fire-and-forget greeting; a missing collector is not an error
    pub async fn hello(&self, id: CollectorId) {
        if let Ok(collector) = self.find(&id) {
            collector.instance.hello().await;
            debug!(collector = %id, "Called hello");
        }
    }

    pub async fn sum(&self, id: CollectorId, x: i32, y: i32) -> Result<i32> {
        let collector = self.find(&id)?;
        let result = collector.instance.sum(x, y).await?;
        debug!(collector = %id, x, y, result, "Called sum");
        Ok(result)
    }

    /// Run a backend-specific verb
    pub async fn invoke(
        &self,
        id: CollectorId,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let collector = self.find(&id)?;
        collector
            .instance
            .invoke(operation, args)
            .await
            .map_err(|e| match e {
                Error::OpUnsupported { operation, .. } => Error::OpUnsupported {
                    backend: collector.backend.clone(),
                    operation,
                },
                other => other,
            })
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close every remaining collector; returns how many were closed
    pub async fn shutdown(&self) -> usize {
        info!(provider_id = self.provider_id, "Finalizing collector provider");
        let closed = self.collectors.remove_all().await;
        info!(provider_id = self.provider_id, closed, "Collector provider finalized");
        closed
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("provider_id", &self.provider_id)
            .field("backends", &self.backends.names())
            .field("collectors", &self.collectors.len())
            .finish()
    }
}
