//! The measured operation and its timed regions.
//!
//! An [`Operation`] wraps the callable being benchmarked. It is either
//! synchronous (returning ends the invocation) or deferred (a
//! [`CompletionHandle`] ends it). Optional setup and teardown closures run once
//! per timed region, outside the timer.

use crate::deferred::{CompletionHandle, Deferred};
use crate::signal::{AbortSignal, either_requested};
use crate::timing::Calibrator;
use crate::types::{OperationError, RunError};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

type SyncFn = Box<dyn FnMut() -> Result<(), OperationError> + Send>;
type DeferredFn = Box<dyn FnMut(CompletionHandle) + Send>;
type HookFn = Box<dyn FnMut() + Send>;

enum Body {
    Sync(SyncFn),
    Deferred(DeferredFn),
}

/// A callable measured by a benchmark.
///
/// # Example
///
/// ```
/// use hzbench_sdk::Operation;
///
/// let mut total = 0_u64;
/// let op = Operation::new(move || {
///     total = total.wrapping_add(1);
/// })
/// .with_setup(|| { /* allocate fixtures */ })
/// .with_teardown(|| { /* release fixtures */ });
/// assert!(!op.is_deferred());
///
/// let failing = Operation::fallible(|| "x".parse::<u32>().map(drop));
/// assert!(!failing.is_deferred());
/// ```
pub struct Operation {
    body: Body,
    setup: Option<HookFn>,
    teardown: Option<HookFn>,
}

/// Outcome of one timed region.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Clocked {
    /// The region completed; seconds elapsed.
    Timed(f64),
    /// The operation failed or panicked.
    Failed(RunError),
    /// An abort was requested while waiting on a deferred completion.
    Interrupted,
}

impl Operation {
    /// Wraps an infallible synchronous closure.
    pub fn new<F>(mut f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::from_body(Body::Sync(Box::new(move || {
            f();
            Ok(())
        })))
    }

    /// Wraps a synchronous closure whose errors fail the run.
    pub fn fallible<F, E>(mut f: F) -> Self
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Into<OperationError>,
    {
        Self::from_body(Body::Sync(Box::new(move || f().map_err(Into::into))))
    }

    /// Wraps a deferred closure that signals completion through the handle it
    /// is given.
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnMut(CompletionHandle) + Send + 'static,
    {
        Self::from_body(Body::Deferred(Box::new(f)))
    }

    fn from_body(body: Body) -> Self {
        Self {
            body,
            setup: None,
            teardown: None,
        }
    }

    /// Runs `setup` before each timed region, outside the timer.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Runs `teardown` after each timed region, outside the timer.
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Whether completion is signaled through a [`CompletionHandle`].
    pub fn is_deferred(&self) -> bool {
        matches!(self.body, Body::Deferred(_))
    }

    fn run_setup(&mut self) -> Result<(), RunError> {
        match self.setup.as_mut() {
            Some(setup) => catch_unwind(AssertUnwindSafe(|| setup())).map_err(RunError::from_panic),
            None => Ok(()),
        }
    }

    fn run_teardown(&mut self) -> Result<(), RunError> {
        match self.teardown.as_mut() {
            Some(teardown) => {
                catch_unwind(AssertUnwindSafe(|| teardown())).map_err(RunError::from_panic)
            }
            None => Ok(()),
        }
    }

    /// Invokes a synchronous body `count` times inside one timed region.
    ///
    /// A deferred body cannot complete synchronously and fails the region.
    pub(crate) fn time_sync(&mut self, count: u64, calibrator: &Calibrator) -> Clocked {
        if let Err(err) = self.run_setup() {
            return Clocked::Failed(err);
        }
        let Body::Sync(f) = &mut self.body else {
            return Clocked::Failed(RunError::Operation(
                "deferred operations need an async runtime".into(),
            ));
        };

        let start = calibrator.now_secs();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            for _ in 0..count {
                f()?;
            }
            Ok::<(), OperationError>(())
        }));
        let elapsed = calibrator.now_secs() - start;

        let clocked = match outcome {
            Ok(Ok(())) => Clocked::Timed(elapsed),
            Ok(Err(err)) => Clocked::Failed(RunError::Operation(err.to_string())),
            Err(payload) => Clocked::Failed(RunError::from_panic(payload)),
        };
        match (clocked, self.run_teardown()) {
            (Clocked::Timed(_), Err(err)) => Clocked::Failed(err),
            (clocked, _) => clocked,
        }
    }

    /// Times one region on the async path.
    ///
    /// Synchronous bodies are timed in place. Deferred bodies are invoked
    /// `count` times in sequence, each awaiting its completion handle; an
    /// abort request on either signal interrupts the wait.
    pub(crate) async fn time_async(
        &mut self,
        count: u64,
        calibrator: &Calibrator,
        own: &AbortSignal,
        parent: Option<&AbortSignal>,
    ) -> Clocked {
        if !self.is_deferred() {
            return self.time_sync(count, calibrator);
        }
        if let Err(err) = self.run_setup() {
            return Clocked::Failed(err);
        }

        let mut region = Deferred::start(calibrator.now_secs());
        let clocked = loop {
            let (handle, completion) = CompletionHandle::channel();
            let invoked = match &mut self.body {
                Body::Deferred(f) => catch_unwind(AssertUnwindSafe(|| f(handle))),
                Body::Sync(_) => Ok(()),
            };
            if let Err(payload) = invoked {
                break Clocked::Failed(RunError::from_panic(payload));
            }

            let resolved = tokio::select! {
                result = completion => Some(result),
                _ = either_requested(own, parent) => None,
            };
            match resolved {
                Some(Ok(())) => {
                    if region.resolved(count) {
                        region.stop(calibrator.now_secs());
                        break Clocked::Timed(region.elapsed);
                    }
                }
                Some(Err(err)) => break Clocked::Failed(err),
                None => break Clocked::Interrupted,
            }
        };

        match (clocked, self.run_teardown()) {
            (Clocked::Timed(_), Err(err)) => Clocked::Failed(err),
            (clocked, _) => clocked,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("deferred", &self.is_deferred())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn manual() -> (ManualClock, Calibrator) {
        let clock = ManualClock::new();
        let calibrator = Calibrator::with_resolution(Arc::new(clock.clone()), 1e-6).unwrap();
        (clock, calibrator)
    }

    #[test]
    fn sync_region_times_count_invocations() {
        let (clock, calibrator) = manual();
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let mut op = Operation::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            clock.advance(Duration::from_millis(2));
        });

        let clocked = op.time_sync(5, &calibrator);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match clocked {
            Clocked::Timed(elapsed) => assert!((elapsed - 0.010).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn setup_and_teardown_run_outside_the_timer() {
        let (clock, calibrator) = manual();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (order.clone(), order.clone(), order.clone());
        let (setup_clock, teardown_clock) = (clock.clone(), clock.clone());

        let mut op = Operation::new(move || a.lock().unwrap().push("op"))
            .with_setup(move || {
                b.lock().unwrap().push("setup");
                setup_clock.advance(Duration::from_secs(1));
            })
            .with_teardown(move || {
                c.lock().unwrap().push("teardown");
                teardown_clock.advance(Duration::from_secs(1));
            });

        assert_eq!(op.time_sync(2, &calibrator), Clocked::Timed(0.0));
        assert_eq!(*order.lock().unwrap(), vec!["setup", "op", "op", "teardown"]);
    }

    #[test]
    fn errors_and_panics_fail_the_region() {
        let (_, calibrator) = manual();
        let mut failing = Operation::fallible(|| Err::<(), _>("bad input"));
        assert_eq!(
            failing.time_sync(3, &calibrator),
            Clocked::Failed(RunError::Operation("bad input".into()))
        );

        let mut panicking = Operation::new(|| panic!("exploded"));
        assert_eq!(
            panicking.time_sync(1, &calibrator),
            Clocked::Failed(RunError::Panicked("exploded".into()))
        );
    }

    #[tokio::test]
    async fn deferred_region_waits_for_every_resolution() {
        let (clock, calibrator) = manual();
        let signal = AbortSignal::new();
        let mut op = Operation::deferred(move |handle| {
            clock.advance(Duration::from_millis(1));
            handle.resolve();
        });

        match op.time_async(4, &calibrator, &signal, None).await {
            Clocked::Timed(elapsed) => assert!((elapsed - 0.004).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn deferred_region_reports_dropped_handles() {
        let (_, calibrator) = manual();
        let signal = AbortSignal::new();
        let mut op = Operation::deferred(drop);
        assert_eq!(
            op.time_async(2, &calibrator, &signal, None).await,
            Clocked::Failed(RunError::Unresolved)
        );
    }

    #[tokio::test]
    async fn abort_interrupts_pending_completion() {
        let (_, calibrator) = manual();
        let signal = AbortSignal::new();
        let parked = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&parked);
        // Never resolves; the handle is parked so it is not dropped.
        let mut op = Operation::deferred(move |handle| keep.lock().unwrap().push(handle));

        signal.request();
        assert_eq!(
            op.time_async(1, &calibrator, &signal, None).await,
            Clocked::Interrupted
        );
        assert_eq!(parked.lock().unwrap().len(), 1);
    }
}
