//! Fixed-capacity concurrency limiter for browser sessions.
//!
//! Every browser-based fetch holds one permit for the whole session;
//! the permit is released by drop on every exit path (result, timeout,
//! error, cancellation). Waiters are served in acquisition order.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SessionLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl SessionLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    /// Wait for a session slot. The returned permit is tied to the
    /// browser task's lifetime, not to this call's scope.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        if self.permits.available_permits() == 0 {
            debug!(capacity = self.capacity, "all browser slots busy, waiting");
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("session semaphore is never closed")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
