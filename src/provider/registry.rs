//! Backend Registry
//!
//! Name-keyed, append-only set of collector backends.

use crate::domain::ports::{CollectorBackend, CollectorBackendRef};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Registry of backends available to one provider
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<BTreeMap<String, CollectorBackendRef>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name
    pub fn register(&self, backend: Arc<dyn CollectorBackend>) -> Result<()> {
        let name = backend.name().to_string();
        let mut backends = self.backends.write();
        if backends.contains_key(&name) {
            return Err(Error::BackendAlreadyRegistered { backend: name });
        }
        info!(backend = %name, "Registered collector backend");
        backends.insert(name, backend);
        Ok(())
    }

    /// Look up a backend by name
    pub fn find(&self, name: &str) -> Option<CollectorBackendRef> {
        self.backends.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.read().contains_key(name)
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<String> {
        self.backends.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DummyBackend;
    use assert_matches::assert_matches;

    #[test]
    fn test_register_and_find() {
        let registry = BackendRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(DummyBackend::new())).unwrap();
        assert!(registry.contains("dummy"));
        assert_eq!(registry.find("dummy").unwrap().name(), "dummy");
        assert!(registry.find("blah").is_none());
        assert_eq!(registry.names(), vec!["dummy".to_string()]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(DummyBackend::new())).unwrap();
        assert_matches!(
            registry.register(Arc::new(DummyBackend::new())),
            Err(Error::BackendAlreadyRegistered { backend }) if backend == "dummy"
        );
        assert_eq!(registry.len(), 1);
    }
}
