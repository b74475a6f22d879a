//! Scoped expiry timer.
//!
//! Holding an `ExpiryTimer` keeps exactly one pending expiry alive; dropping
//! it aborts the underlying tokio task, so replacing or clearing the slot that
//! owns it is the only cancellation path.

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

/// A single armed expiry
#[derive(Debug)]
pub struct ExpiryTimer {
    handle: Option<AbortHandle>,
}

impl ExpiryTimer {
    /// Spawn `fire` to run once `delay` has elapsed
    pub fn arm<F>(delay: Duration, fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire.await;
        });

        Self {
            handle: Some(task.abort_handle()),
        }
    }

    /// Release the slot from inside the firing task without aborting it
    pub fn fired(mut self) {
        self.handle = None;
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
