//! Externally signaled completion for deferred operations.
//!
//! A deferred operation does not finish when it returns. It receives a
//! [`CompletionHandle`] and must call [`CompletionHandle::resolve`] exactly
//! once, possibly from another task, when the unit of work is done. The timed
//! region spans from the first invocation until the `count`-th resolution.

use crate::types::{OperationError, RunError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Signals that one invocation of a deferred operation finished.
///
/// Consumed by [`resolve`](Self::resolve) or [`reject`](Self::reject).
/// Dropping it unresolved fails the run with [`RunError::Unresolved`].
///
/// ```
/// use hzbench_sdk::deferred::CompletionHandle;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let (handle, completion) = CompletionHandle::channel();
/// tokio::spawn(async move { handle.resolve() });
/// assert!(completion.await.is_ok());
/// # });
/// ```
#[derive(Debug)]
pub struct CompletionHandle {
    tx: oneshot::Sender<Result<(), RunError>>,
}

/// Receiving side of a [`CompletionHandle`].
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<(), RunError>>,
}

impl CompletionHandle {
    /// Creates a handle together with the completion it resolves.
    pub fn channel() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, Completion { rx })
    }

    /// Marks the invocation as finished.
    pub fn resolve(self) {
        // The receiver is gone only if the run was aborted; nothing to report.
        let _ = self.tx.send(Ok(()));
    }

    /// Marks the invocation as failed.
    pub fn reject(self, error: impl Into<OperationError>) {
        let error = error.into();
        let _ = self.tx.send(Err(RunError::Operation(error.to_string())));
    }
}

impl Future for Completion {
    type Output = Result<(), RunError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RunError::Unresolved)))
    }
}

/// Progress of one deferred timed region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deferred {
    /// Invocations resolved so far in this region.
    pub cycles: u64,
    /// Seconds from the region's start to its final resolution.
    pub elapsed: f64,
    /// Clock reading (seconds) when the region started.
    pub timestamp: f64,
}

impl Deferred {
    /// Starts a region at `timestamp`.
    pub fn start(timestamp: f64) -> Self {
        Self {
            cycles: 0,
            elapsed: 0.0,
            timestamp,
        }
    }

    /// Records one resolution. Returns `true` once `count` invocations have
    /// resolved.
    pub fn resolved(&mut self, count: u64) -> bool {
        self.cycles += 1;
        self.cycles >= count
    }

    /// Closes the region at `now`.
    pub fn stop(&mut self, now: f64) {
        self.elapsed = now - self.timestamp;
        self.cycles = 0;
    }
}
