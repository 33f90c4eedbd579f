//! Bounded worker pool
//!
//! Every inbound RPC runs as its own tokio task once it holds a permit, so a
//! handler keeps running even if the caller that dispatched it goes away.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrently running handlers
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Pool of handler slots shared by all request types of a provider
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool; a size of zero falls back to [`DEFAULT_POOL_SIZE`]
    pub fn new(size: usize) -> Self {
        let size = if size == 0 { DEFAULT_POOL_SIZE } else { size };
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle workers
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` on a worker. The task is detached: dropping the returned
    /// handle does not cancel it.
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::Internal("worker pool closed".into()))?;
            task.await
        })
    }

    /// Run `task` on a worker and wait for its result
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(task)
            .await
            .map_err(|e| Error::Internal(format!("worker task failed: {}", e)))?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
