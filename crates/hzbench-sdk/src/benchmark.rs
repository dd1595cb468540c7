//! Benchmarks and their lifecycle.
//!
//! A [`Benchmark`] owns a measured [`Operation`], its [`BenchOptions`], the
//! shared [`Calibrator`] and an [`Emitter`] for lifecycle events. Running it
//! drives the sampler, which repeatedly times the operation until enough
//! samples have been collected, and leaves the results in [`BenchState`].
//!
//! ## Lifecycle
//!
//! ```text
//! fresh --run--> running --(samples collected)--> complete
//!                   |
//!                   +--abort--> aborted --reset/run--> fresh
//! ```
//!
//! Every transition is published as an [`Event`] so listeners can observe it
//! and, where the transition allows it, cancel it.

use crate::compare::{Speed, compare_samples};
use crate::event::{Emitter, Event, EventKind, Flow, Listener, ListenerId, Target};
use crate::operation::Operation;
use crate::options::BenchOptions;
use crate::signal::{AbortHandle, AbortSignal};
use crate::stats::{Stats, Times};
use crate::timing::Calibrator;
use crate::types::{BenchError, RunError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_BENCH_ID: AtomicU64 = AtomicU64::new(1);

/// Observable state of a benchmark.
///
/// Listeners receive snapshots of this state as the event target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchState {
    /// Unique identifier, assigned at construction.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Iterations in the most recent timed region.
    pub count: u64,
    /// Most timed regions any sampling round needed.
    pub cycles: u32,
    /// Operations per second.
    pub hz: f64,
    /// Sample statistics.
    pub stats: Stats,
    /// Timing summary.
    pub times: Times,
    /// Whether a run is in progress.
    pub running: bool,
    /// Whether the last run was aborted.
    pub aborted: bool,
    /// Failure captured from the last run.
    pub error: Option<RunError>,
}

impl BenchState {
    fn fresh(id: u64, name: String) -> Self {
        Self {
            id,
            name,
            count: 0,
            cycles: 0,
            hz: 0.0,
            stats: Stats::default(),
            times: Times::default(),
            running: false,
            aborted: false,
            error: None,
        }
    }
}

/// A measurable unit of work.
///
/// # Example
///
/// ```
/// use hzbench_sdk::{BenchOptions, Benchmark, Calibrator, Operation};
/// use std::hint::black_box;
/// use std::sync::Arc;
///
/// let calibrator = Arc::new(Calibrator::system()?);
/// let mut bench = Benchmark::builder("sum", Operation::new(|| {
///     black_box((0..64u64).sum::<u64>());
/// }))
/// .calibrator(calibrator)
/// .options(BenchOptions { max_time: 0.05, min_samples: 2, ..BenchOptions::default() })
/// .build()?;
///
/// bench.run()?;
/// assert!(bench.hz() > 0.0);
/// assert!(bench.stats().len() >= 2);
/// # Ok::<(), hzbench_sdk::BenchError>(())
/// ```
pub struct Benchmark {
    pub(crate) state: BenchState,
    pub(crate) options: BenchOptions,
    pub(crate) operation: Operation,
    pub(crate) calibrator: Arc<Calibrator>,
    pub(crate) events: Emitter,
    pub(crate) signal: Arc<AbortSignal>,
    pub(crate) parent: Option<Arc<AbortSignal>>,
}

impl Benchmark {
    /// Creates a benchmark with default options.
    pub fn new(name: impl Into<String>, operation: Operation, calibrator: Arc<Calibrator>) -> Self {
        let mut options = BenchOptions::default();
        options.deferred = operation.is_deferred();
        Self::assemble(name.into(), operation, calibrator, options, Emitter::new())
    }

    /// Creates a benchmark with explicit options.
    ///
    /// `options.deferred` is taken from the operation.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidOptions`] if the options fail validation.
    pub fn with_options(
        name: impl Into<String>,
        operation: Operation,
        calibrator: Arc<Calibrator>,
        mut options: BenchOptions,
    ) -> Result<Self, BenchError> {
        options.validate()?;
        options.deferred = operation.is_deferred();
        Ok(Self::assemble(
            name.into(),
            operation,
            calibrator,
            options,
            Emitter::new(),
        ))
    }

    /// Starts a [`BenchmarkBuilder`].
    pub fn builder(name: impl Into<String>, operation: Operation) -> BenchmarkBuilder {
        BenchmarkBuilder::new(name, operation)
    }

    fn assemble(
        name: String,
        operation: Operation,
        calibrator: Arc<Calibrator>,
        options: BenchOptions,
        events: Emitter,
    ) -> Self {
        let id = NEXT_BENCH_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            state: BenchState::fresh(id, name),
            options,
            operation,
            calibrator,
            events,
            signal: Arc::new(AbortSignal::new()),
            parent: None,
        }
    }

    /// Runs the benchmark to completion on the calling thread.
    ///
    /// Operation failures do not surface here; they are recorded in
    /// [`BenchState::error`] and published as `error` events.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::DeferredRequiresAsync`] for deferred operations.
    pub fn run(&mut self) -> Result<(), BenchError> {
        if self.options.deferred {
            return Err(BenchError::DeferredRequiresAsync {
                name: self.state.name.clone(),
            });
        }
        if self.begin() {
            self.sample();
        }
        Ok(())
    }

    /// Runs the benchmark on the current async runtime.
    ///
    /// Deferred operations await their completion handles. When the options
    /// are asynchronous, cycles and sampling rounds are separated by
    /// `options.delay`.
    pub async fn run_async(&mut self) {
        if self.begin() {
            self.sample_async().await;
        }
    }

    /// Prepares a run. Returns `false` if a `start` listener cancelled it.
    pub(crate) fn begin(&mut self) -> bool {
        // Not running, so reset restores defaults instead of aborting.
        self.state.running = false;
        self.reset();
        self.state.running = true;
        self.state.error = None;
        self.state.count = self.options.init_count;
        self.state.times.timestamp = self.calibrator.now_secs();
        self.signal.clear();

        let event = self.fire(Event::new(EventKind::Start));
        if event.cancelled {
            debug!(name = %self.state.name, "start cancelled");
            self.state.running = false;
            return false;
        }
        debug!(
            name = %self.state.name,
            init_count = self.options.init_count,
            min_time = self.min_time(),
            "benchmark started"
        );
        true
    }

    /// Aborts a running benchmark.
    ///
    /// Emits a cancellable `abort` event, then restores default state and
    /// marks the benchmark aborted. Does nothing when not running, so calling
    /// it twice is the same as calling it once.
    pub fn abort(&mut self) {
        self.abort_inner(false);
    }

    pub(crate) fn abort_inner(&mut self, resetting: bool) {
        if !self.state.running {
            return;
        }
        let event = self.fire(Event::new(EventKind::Abort));
        if event.cancelled && !resetting {
            // A vetoed request is consumed, including one from the suite.
            self.signal.clear();
            self.parent = None;
            return;
        }
        self.restore_defaults();
        if !resetting {
            debug!(name = %self.state.name, "benchmark aborted");
            self.state.aborted = true;
            self.state.running = false;
        }
    }

    /// Restores the benchmark to its fresh state.
    ///
    /// A `reset` event is emitted only if something would change; cancelling
    /// it keeps the current state. A running benchmark is aborted instead.
    pub fn reset(&mut self) {
        if self.state.running {
            self.abort_inner(true);
        } else {
            self.restore_defaults();
        }
    }

    fn restore_defaults(&mut self) {
        let mut fresh = BenchState::fresh(self.state.id, self.state.name.clone());
        // A captured failure stays visible until the next run.
        fresh.error = self.state.error.clone();
        if fresh == self.state {
            return;
        }
        let event = self.fire(Event::new(EventKind::Reset));
        if !event.cancelled {
            self.state = fresh;
        }
    }

    /// Compares this benchmark's sample against `other`'s.
    ///
    /// Returns [`Speed::Same`] when comparing a benchmark with itself.
    pub fn compare(&self, other: &Benchmark) -> Speed {
        if self.state.id == other.state.id {
            return Speed::Same;
        }
        compare_samples(&self.state.stats.sample, &other.state.stats.sample)
    }

    /// Returns a handle that requests an abort from outside the run.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(Arc::clone(&self.signal))
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Arc<AbortSignal>>) {
        self.parent = parent;
    }

    pub(crate) fn abort_requested(&self) -> bool {
        self.signal.is_requested()
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_requested())
    }

    /// Registers a listener.
    pub fn on<F, R>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.events.on(kind, listener)
    }

    /// Removes one listener, or all listeners of `kind` when `id` is `None`.
    pub fn off(&mut self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.events.off(kind, id)
    }

    /// The listeners registered for `kind`.
    pub fn listeners(&mut self, kind: EventKind) -> &mut Vec<Listener> {
        self.events.listeners(kind)
    }

    /// Emits `event` to this benchmark's listeners.
    ///
    /// The target defaults to a snapshot of this benchmark.
    pub fn emit(&mut self, event: impl Into<Event>) -> Option<Flow> {
        self.fire(event.into()).result
    }

    pub(crate) fn fire(&mut self, mut event: Event) -> Event {
        let snapshot = self.target();
        if event.target.is_none() {
            event.target = Some(snapshot.clone());
        }
        event.current_target = Some(snapshot);
        self.events.emit(&mut event);
        event
    }

    /// A snapshot of this benchmark as an event target.
    pub fn target(&self) -> Target {
        Target::Benchmark(Box::new(self.state.clone()))
    }

    /// Unique identifier.
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Current state.
    pub fn state(&self) -> &BenchState {
        &self.state
    }

    /// Sample statistics.
    pub fn stats(&self) -> &Stats {
        &self.state.stats
    }

    /// Timing summary.
    pub fn times(&self) -> &Times {
        &self.state.times
    }

    /// Operations per second.
    pub fn hz(&self) -> f64 {
        self.state.hz
    }

    /// Failure captured from the last run.
    pub fn error(&self) -> Option<&RunError> {
        self.state.error.as_ref()
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Whether the last run was aborted.
    pub fn is_aborted(&self) -> bool {
        self.state.aborted
    }

    /// Options in effect.
    pub fn options(&self) -> &BenchOptions {
        &self.options
    }

    /// The shared calibrator.
    pub fn calibrator(&self) -> &Arc<Calibrator> {
        &self.calibrator
    }

    /// Minimum duration of a timed region in seconds.
    ///
    /// `options.min_time`, or the calibrator's minimum run duration when that
    /// is zero.
    pub fn min_time(&self) -> f64 {
        if self.options.min_time > 0.0 {
            self.options.min_time
        } else {
            self.calibrator.minimum_run_duration()
        }
    }
}

impl std::fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Benchmark")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing benchmarks
///
/// Provides a fluent interface for configuring options and lifecycle
/// listeners.
///
/// # Example
///
/// ```
/// use hzbench_sdk::{Benchmark, Operation};
///
/// let bench = Benchmark::builder("noop", Operation::new(|| {}))
///     .min_samples(10)
///     .max_time(0.5)
///     .on_complete(|event| println!("done: {:?}", event.target))
///     .build()?;
/// assert_eq!(bench.options().min_samples, 10);
/// # Ok::<(), hzbench_sdk::BenchError>(())
/// ```
pub struct BenchmarkBuilder {
    name: String,
    operation: Operation,
    calibrator: Option<Arc<Calibrator>>,
    options: BenchOptions,
    events: Emitter,
}

impl BenchmarkBuilder {
    /// Creates a new benchmark builder
    ///
    /// # Arguments
    ///
    /// * `name` - Display name of the benchmark
    /// * `operation` - The operation to measure
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        Self {
            name: name.into(),
            operation,
            calibrator: None,
            options: BenchOptions::default(),
            events: Emitter::new(),
        }
    }

    /// Shares an existing calibrator. Without one, `build` calibrates the
    /// system clock.
    pub fn calibrator(mut self, calibrator: Arc<Calibrator>) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    /// Replaces all options.
    pub fn options(mut self, options: BenchOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the minimum timed region duration (seconds).
    pub fn min_time(mut self, seconds: f64) -> Self {
        self.options.min_time = seconds;
        self
    }

    /// Sets the maximum sampling duration (seconds).
    pub fn max_time(mut self, seconds: f64) -> Self {
        self.options.max_time = seconds;
        self
    }

    /// Sets the iteration count of the first timed region.
    pub fn init_count(mut self, count: u64) -> Self {
        self.options.init_count = count;
        self
    }

    /// Sets the minimum number of samples.
    pub fn min_samples(mut self, samples: usize) -> Self {
        self.options.min_samples = samples;
        self
    }

    /// Yields to the runtime between cycles when run asynchronously.
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.options.asynchronous = asynchronous;
        self
    }

    /// Sets the pause between cycles (seconds).
    pub fn delay(mut self, seconds: f64) -> Self {
        self.options.delay = seconds;
        self
    }

    /// Registers a listener for any event type.
    pub fn on<F, R>(mut self, kind: EventKind, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.events.on(kind, listener);
        self
    }

    /// Registers a `start` listener.
    pub fn on_start<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Start, listener)
    }

    /// Registers a `cycle` listener.
    pub fn on_cycle<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Cycle, listener)
    }

    /// Registers an `abort` listener.
    pub fn on_abort<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Abort, listener)
    }

    /// Registers an `error` listener.
    pub fn on_error<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Error, listener)
    }

    /// Registers a `reset` listener.
    pub fn on_reset<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Reset, listener)
    }

    /// Registers a `complete` listener.
    pub fn on_complete<F, R>(self, listener: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.on(EventKind::Complete, listener)
    }

    /// Builds the benchmark.
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid or, when no calibrator was supplied,
    /// the system clock cannot be calibrated.
    pub fn build(self) -> Result<Benchmark, BenchError> {
        let mut options = self.options;
        options.validate()?;
        options.deferred = self.operation.is_deferred();
        let calibrator = match self.calibrator {
            Some(calibrator) => calibrator,
            None => Arc::new(Calibrator::system()?),
        };
        Ok(Benchmark::assemble(
            self.name,
            self.operation,
            calibrator,
            options,
            self.events,
        ))
    }
}
