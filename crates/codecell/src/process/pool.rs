//! Bound on concurrent executions

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

use crate::process::ProcessError;

/// Limits how many requests may run child processes at once
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct SpawnPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the whole lifetime of one request; released on drop
#[derive(Debug)]
pub struct SpawnPermit {
    _permit: OwnedSemaphorePermit,
}

impl SpawnPool {
    /// Create a pool admitting `capacity` requests, at least one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<SpawnPermit, ProcessError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProcessError::PoolClosed)?;

        debug!(available = self.available(), "acquired spawn permit");
        Ok(SpawnPermit { _permit: permit })
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
