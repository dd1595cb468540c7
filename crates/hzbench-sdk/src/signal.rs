//! Abort requests that cross task and listener boundaries.
//!
//! Listeners only see an [`Event`](crate::Event), and a measured operation
//! only sees itself, so neither can call [`Benchmark::abort`](crate::Benchmark::abort)
//! directly. An [`AbortHandle`] fills that gap: it is cheap to clone, can be
//! moved into closures or other tasks, and requests an abort that the run
//! honors at its next cycle boundary. In asynchronous mode a request also
//! wakes any pending inter-cycle delay immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Shared abort flag with async wake-up.
#[derive(Debug, Default)]
pub struct AbortSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl AbortSignal {
    /// Creates a signal with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an abort and wakes every waiter.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether an abort has been requested since the last [`clear`](Self::clear).
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Drops any pending request.
    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Completes once an abort has been requested.
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a request between the
            // check and the await is not missed.
            notified.as_mut().enable();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Completes once either signal has been requested.
pub(crate) async fn either_requested(own: &AbortSignal, parent: Option<&AbortSignal>) {
    match parent {
        Some(parent) => {
            tokio::select! {
                _ = own.requested() => {}
                _ = parent.requested() => {}
            }
        }
        None => own.requested().await,
    }
}

/// Cloneable handle that requests an abort of a running benchmark or suite.
///
/// ```
/// use hzbench_sdk::signal::{AbortHandle, AbortSignal};
/// use std::sync::Arc;
///
/// let signal = Arc::new(AbortSignal::new());
/// let handle = AbortHandle::new(Arc::clone(&signal));
/// let remote = handle.clone();
///
/// remote.abort();
/// assert!(handle.is_abort_requested());
/// assert!(signal.is_requested());
/// ```
#[derive(Debug, Clone)]
pub struct AbortHandle {
    signal: Arc<AbortSignal>,
}

impl AbortHandle {
    /// Wraps a shared signal.
    pub fn new(signal: Arc<AbortSignal>) -> Self {
        Self { signal }
    }

    /// Requests an abort. Idempotent.
    pub fn abort(&self) {
        self.signal.request();
    }

    /// Whether an abort is pending.
    pub fn is_abort_requested(&self) -> bool {
        self.signal.is_requested()
    }
}
