//! Collector Backends
//!
//! Backends compiled into the crate:
//! - Dummy: in-memory demo backend, registered on every provider

pub mod dummy;

pub use dummy::*;

use crate::domain::ports::CollectorBackendRef;
use std::sync::Arc;

/// Factory for the backends compiled into this crate
pub struct BackendFactory;

impl BackendFactory {
    /// Create a built-in backend by name
    pub fn create(name: &str) -> Option<CollectorBackendRef> {
        match name {
            DUMMY_BACKEND_NAME => Some(Arc::new(DummyBackend::new())),
            _ => None,
        }
    }

    /// Names accepted by [`BackendFactory::create`]
    pub fn builtin_names() -> &'static [&'static str] {
        &[DUMMY_BACKEND_NAME]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory() {
        for name in BackendFactory::builtin_names() {
            assert_eq!(BackendFactory::create(name).unwrap().name(), *name);
        }
        assert!(BackendFactory::create("seaweedfs").is_none());
    }
}
