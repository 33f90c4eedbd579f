//! Collector handle
//!
//! A reference-counted remote handle on one collector. The count starts at 1;
//! the release that brings it to zero drops the provider address, decrements
//! the owning client's open-handle count and makes the handle unusable.

use super::client::Client;
use super::transport::ProviderHandle;
use crate::api::messages::*;
use crate::domain::ports::CollectorId;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct HandleState {
    client: Client,
    provider: ProviderHandle,
}

struct HandleInner {
    id: CollectorId,
    refcount: AtomicU64,
    state: Mutex<Option<HandleState>>,
}

/// Client-side handle on a remote collector. Clones share one refcount.
#[derive(Clone)]
pub struct CollectorHandle {
    inner: Arc<HandleInner>,
}

impl CollectorHandle {
    pub(crate) fn new(client: Client, provider: ProviderHandle, id: CollectorId) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                refcount: AtomicU64::new(1),
                state: Mutex::new(Some(HandleState { client, provider })),
            }),
        }
    }

    pub fn id(&self) -> CollectorId {
        self.inner.id
    }

    pub fn refcount(&self) -> u64 {
        self.inner.refcount.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.refcount() == 0
    }

    /// Take one more reference. A released handle cannot be revived.
    pub fn ref_incr(&self) -> Result<()> {
        self.inner
            .refcount
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                if count == 0 {
                    None
                } else {
                    Some(count + 1)
                }
            })
            .map(|_| ())
            .map_err(|_| released(self.inner.id))
    }

    /// Drop one reference, freeing the handle on the last one.
    /// Releasing past zero fails and changes nothing.
    pub fn release(&self) -> Result<()> {
        let previous = self
            .inner
            .refcount
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1))
            .map_err(|_| released(self.inner.id))?;

        if previous == 1 {
            if let Some(state) = self.inner.state.lock().take() {
                state.client.handle_released();
                debug!(collector = %self.inner.id, provider = %state.provider, "Collector handle freed");
            }
        }
        Ok(())
    }

    fn state(&self) -> Result<(Client, ProviderHandle)> {
        self.inner
            .state
            .lock()
            .as_ref()
            .map(|s| (s.client.clone(), s.provider.clone()))
            .ok_or_else(|| released(self.inner.id))
    }

    /// Ask the collector to greet. Succeeds once the request is delivered;
    /// the provider never reports whether the collector exists.
    pub async fn say_hello(&self) -> Result<()> {
        let (client, provider) = self.state()?;
        client
            .transport()
            .notify(&provider, RPC_HELLO, &HelloRequest { id: self.inner.id })
            .await
    }

    /// Have the collector compute `x + y`
    pub async fn compute_sum(&self, x: i32, y: i32) -> Result<i32> {
        let (client, provider) = self.state()?;
        let reply: SumReply = client
            .transport()
            .call_for(
                &provider,
                RPC_SUM,
                &SumRequest {
                    id: self.inner.id,
                    x,
                    y,
                },
            )
            .await?;
        Ok(reply.result)
    }

    /// Run a backend-specific operation
    pub async fn invoke(&self, operation: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let (client, provider) = self.state()?;
        let reply: InvokeReply = client
            .transport()
            .call_for(
                &provider,
                RPC_INVOKE,
                &InvokeRequest {
                    id: self.inner.id,
                    operation: operation.to_string(),
                    args,
                },
            )
            .await?;
        Ok(reply.result)
    }
}

fn released(id: CollectorId) -> Error {
    Error::InvalidArgs(format!("handle on collector {} already released", id))
}

impl std::fmt::Debug for CollectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorHandle")
            .field("id", &self.inner.id)
            .field("refcount", &self.refcount())
            .finish()
    }
}
