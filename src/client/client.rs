//! Collector client
//!
//! Entry point of the ordinary client role. A [`Client`] hands out
//! [`CollectorHandle`]s and keeps count of the ones not yet released.

use super::handle::CollectorHandle;
use super::transport::{ProviderHandle, RpcTransport, DEFAULT_TIMEOUT_MS};
use crate::domain::ports::CollectorId;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

struct ClientInner {
    transport: RpcTransport,
    open_handles: AtomicU64,
    finalized: AtomicBool,
}

impl ClientInner {
    /// Warn about unreleased handles; returns how many there are
    fn report_leaks(&self, when: &str) -> u64 {
        let open = self.open_handles.load(Ordering::SeqCst);
        if open != 0 {
            warn!(open_handles = open, "Collector client {} with handles still open", when);
        }
        open
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.finalized.load(Ordering::SeqCst) {
            self.report_leaks("dropped");
        }
    }
}

/// Cheaply cloneable client; clones share the transport and the handle count
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(RpcTransport::new(DEFAULT_TIMEOUT_MS)?))
    }

    pub fn with_transport(transport: RpcTransport) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                open_handles: AtomicU64::new(0),
                finalized: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn transport(&self) -> &RpcTransport {
        &self.inner.transport
    }

    /// Bind a handle to collector `id` on `provider`.
    ///
    /// The provider is not contacted, so a handle to a missing collector only
    /// fails on first use.
    pub fn collector_handle(&self, provider: &ProviderHandle, id: CollectorId) -> CollectorHandle {
        self.inner.open_handles.fetch_add(1, Ordering::SeqCst);
        CollectorHandle::new(self.clone(), provider.clone(), id)
    }

    /// Handles created but not yet fully released
    pub fn open_handles(&self) -> u64 {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    pub(crate) fn handle_released(&self) {
        self.inner.open_handles.fetch_sub(1, Ordering::SeqCst);
    }

    /// Tear the client down, warning about handles that were never released.
    /// Returns the number of such handles. A client dropped without being
    /// finalized warns the same way once its last clone goes away.
    pub fn finalize(self) -> u64 {
        self.inner.finalized.store(true, Ordering::SeqCst);
        self.inner.report_leaks("finalized")
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("open_handles", &self.open_handles())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_count_tracks_release() {
        let client = Client::new().unwrap();
        let provider = ProviderHandle::new("127.0.0.1:1", 0);

        let a = client.collector_handle(&provider, CollectorId::generate());
        let b = client.collector_handle(&provider, CollectorId::generate());
        assert_eq!(client.open_handles(), 2);

        a.release().unwrap();
        assert_eq!(client.open_handles(), 1);
        assert_eq!(client.clone().finalize(), 1);

        b.release().unwrap();
        assert_eq!(client.finalize(), 0);
    }

    #[test]
    fn test_dropped_client_reports_leaked_handles() {
        let client = Client::new().unwrap();
        let provider = ProviderHandle::new("127.0.0.1:1", 0);
        let inner = Arc::downgrade(&client.inner);

        let leaked = client.collector_handle(&provider, CollectorId::generate());
        assert_eq!(client.inner.report_leaks("checked"), 1);
        assert!(!client.inner.finalized.load(Ordering::SeqCst));

        // The handle keeps the client alive until it goes away too.
        drop(client);
        assert!(inner.upgrade().is_some());
        drop(leaked);
        assert!(inner.upgrade().is_none());
    }
}
