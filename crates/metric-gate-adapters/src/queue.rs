// crates/metric-gate-adapters/src/queue.rs
// ============================================================================
// Module: Request Queue
// Description: Backpressure gate bounding concurrent and queued requests.
// Purpose: Reject excess load early instead of letting it pile up unbounded.
// Dependencies: metric-gate-adapters, tokio
// ============================================================================

//! ## Overview
//! A semaphore of size `max_concurrent` plus a bounded outstanding counter
//! capped at `max_queue_size`. Enqueue bumps the counter first and rejects
//! when the cap is exceeded; the counter is decremented on every exit,
//! success or failure, so the bookkeeping stays symmetric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::Semaphore;

use crate::AdapterError;

// ============================================================================
// SECTION: Queue
// ============================================================================

/// Async request queue for backpressure management.
///
/// # Invariants
/// - At most `max_concurrent` wrapped futures run at once.
/// - The outstanding counter never exceeds `max_queue_size`.
/// - Every admission is balanced by exactly one release.
#[derive(Debug)]
pub struct RequestQueue {
    /// Maximum queued-or-running requests before rejection.
    max_queue_size: usize,
    /// Concurrency gate.
    semaphore: Arc<Semaphore>,
    /// Outstanding request counter.
    outstanding: Mutex<usize>,
}

impl RequestQueue {
    /// Creates a queue admitting `max_concurrent` parallel requests and at
    /// most `max_queue_size` outstanding requests overall.
    #[must_use]
    pub fn new(max_concurrent: usize, max_queue_size: usize) -> Self {
        Self {
            max_queue_size,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            outstanding: Mutex::new(0),
        }
    }

    /// Executes a future under the queue's admission control.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::QueueFull`] when the outstanding cap is
    /// exceeded, or the wrapped future's own error.
    pub async fn execute<T, F>(&self, operation: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, AdapterError>>,
    {
        {
            let mut outstanding = self.outstanding.lock().await;
            if *outstanding >= self.max_queue_size {
                return Err(AdapterError::QueueFull {
                    max_queue_size: self.max_queue_size,
                });
            }
            *outstanding += 1;
        }
        let result = {
            let permit = self.semaphore.clone().acquire_owned().await;
            match permit {
                Ok(_permit) => operation.await,
                Err(_) => Err(AdapterError::Protocol {
                    message: "request queue semaphore closed".to_string(),
                }),
            }
        };
        let mut outstanding = self.outstanding.lock().await;
        *outstanding = outstanding.saturating_sub(1);
        result
    }

    /// Returns the current outstanding request count.
    pub async fn outstanding(&self) -> usize {
        *self.outstanding.lock().await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
