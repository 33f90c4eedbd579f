//! Provider Set
//!
//! Several providers can share one listening endpoint; requests carry the
//! provider id that selects among them.

use super::provider::{Provider, ProviderConfig};
use crate::error::{Error, Result};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

/// Providers colocated on one endpoint, keyed by provider id
#[derive(Default)]
pub struct ProviderSet {
    providers: DashMap<u16, Arc<Provider>>,
}

impl ProviderSet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build one provider per config entry
    pub fn from_configs(configs: &[ProviderConfig]) -> Result<Arc<Self>> {
        let set = Self::new();
        for config in configs {
            set.register(Provider::new(config.clone()))?;
        }
        Ok(set)
    }

    /// Attach a provider; its id must be free on this endpoint
    pub fn register(&self, provider: Arc<Provider>) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        let provider_id = provider.provider_id();
        match self.providers.entry(provider_id) {
            Entry::Occupied(_) => Err(Error::ProviderAlreadyRegistered { provider_id }),
            Entry::Vacant(slot) => {
                slot.insert(provider);
                Ok(())
            }
        }
    }

    pub fn get(&self, provider_id: u16) -> Result<Arc<Provider>> {
        self.providers
            .get(&provider_id)
            .map(|p| p.value().clone())
            .ok_or(Error::InvalidProvider { provider_id })
    }

    /// Detach a provider and close its collectors
    pub async fn deregister(&self, provider_id: u16) -> Result<usize> {
        let (_, provider) = self
            .providers
            .remove(&provider_id)
            .ok_or(Error::InvalidProvider { provider_id })?;
        Ok(provider.shutdown().await)
    }

    /// Registered provider ids, sorted
    pub fn ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.providers.iter().map(|p| *p.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Detach every provider and close all collectors, providers in parallel
    pub async fn shutdown(&self) -> usize {
        let detached: Vec<Arc<Provider>> = self
            .ids()
            .into_iter()
            .filter_map(|id| self.providers.remove(&id).map(|(_, p)| p))
            .collect();
        let closed: usize = join_all(detached.iter().map(|p| p.shutdown()))
            .await
            .into_iter()
            .sum();
        info!(closed, "All providers finalized");
        closed
    }
}
