// src/debounce.rs

//! Trailing-edge debouncing.
//!
//! A [`Debouncer`] collapses a burst of `trigger` calls into exactly one
//! execution of the most recently supplied action, deferred by a fixed delay
//! from the *last* call. The window resets on every call; this is not a
//! rate limiter.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Coalesces rapid trigger bursts into a single deferred execution.
///
/// At most one scheduled action is pending at any instant: a new `trigger`
/// call aborts and replaces the previous one. A superseded action whose
/// delay has not yet elapsed never runs.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` to run once the delay elapses with no further
    /// `trigger` calls in between.
    ///
    /// Concurrent calls are serialized under the pending-slot lock, so
    /// replacement is race-free. Must be called from within a Tokio runtime.
    pub fn trigger<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.lock_pending();

        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            action.await;
        }));
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
