//! Benchmark suites.
//!
//! A [`Suite`] runs its member benchmarks one after another through the
//! generic sequencer in [`crate::invoke`] and republishes their progress as
//! suite events:
//!
//! - `start` once, targeting the first member;
//! - `cycle` after each member finishes, preceded by `error` when the member
//!   recorded a failure;
//! - `complete` once at the end, including after an abort.
//!
//! A failing member does not stop the suite. Calling [`Event::abort`] on a
//! suite `cycle` event, or requesting an abort through
//! [`Suite::abort_handle`], aborts the suite and skips the remaining members.

use crate::benchmark::Benchmark;
use crate::compare::{Filter, filter};
use crate::config::HarnessConfig;
use crate::event::{Emitter, Event, EventKind, Flow, Listener, ListenerId, SuiteInfo, Target};
use crate::invoke::{Hooks, Invoke, NoHooks, Schedulable};
use crate::operation::Operation;
use crate::options::BenchOptions;
use crate::signal::{AbortHandle, AbortSignal};
use crate::timing::Calibrator;
use crate::types::BenchError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

impl Schedulable for Benchmark {
    fn target(&self) -> Target {
        Benchmark::target(self)
    }

    fn is_asynchronous(&self) -> bool {
        self.options.is_async()
    }

    fn delay(&self) -> Duration {
        self.options.delay_duration()
    }
}

/// Suite state that sequencer hooks need while the members are borrowed.
struct SuiteCore {
    name: String,
    running: bool,
    aborted: bool,
    events: Emitter,
    signal: Arc<AbortSignal>,
}

impl SuiteCore {
    fn info(&self, len: usize) -> SuiteInfo {
        SuiteInfo {
            name: self.name.clone(),
            len,
            running: self.running,
            aborted: self.aborted,
        }
    }

    /// Emits `event` to the suite's listeners. The target defaults to the
    /// suite itself.
    fn dispatch(&mut self, event: &mut Event, len: usize) {
        let info = Target::Suite(self.info(len));
        if event.target.is_none() {
            event.target = Some(info.clone());
        }
        event.current_target = Some(info);
        self.events.emit(event);
    }

    fn abort(&mut self, members: &mut Vec<Benchmark>, resetting: bool) {
        if !self.running {
            return;
        }
        let mut event = Event::new(EventKind::Abort);
        self.dispatch(&mut event, members.len());
        if event.cancelled && !resetting {
            return;
        }
        self.restore(members, true);
        if !resetting {
            debug!(suite = %self.name, "suite aborted");
            self.aborted = true;
            Invoke::new(NoHooks).run(members, Benchmark::abort);
        }
    }

    fn restore(&mut self, members: &mut Vec<Benchmark>, aborting: bool) {
        if self.running && !aborting {
            self.abort(members, true);
            return;
        }
        if !(self.aborted || self.running) {
            return;
        }
        let mut event = Event::new(EventKind::Reset);
        self.dispatch(&mut event, members.len());
        if event.cancelled {
            return;
        }
        self.aborted = false;
        self.running = false;
        if !aborting {
            Invoke::new(NoHooks).run(members, Benchmark::reset);
        }
    }
}

/// Republishes sequencer progress on the suite.
struct SuiteHooks<'a> {
    core: &'a mut SuiteCore,
}

impl Hooks<Benchmark> for SuiteHooks<'_> {
    fn on_start(&mut self, event: &mut Event, members: &mut Vec<Benchmark>) {
        self.core.dispatch(event, members.len());
    }

    fn on_cycle(&mut self, event: &mut Event, members: &mut Vec<Benchmark>) {
        let len = members.len();
        let failed = match &event.target {
            Some(Target::Benchmark(state)) => state.error.as_ref().map(|err| (state, err)),
            _ => None,
        };
        if let Some((state, err)) = failed {
            warn!(suite = %self.core.name, benchmark = %state.name, error = %err, "member failed");
            let mut error = Event::new(EventKind::Error)
                .with_target(Target::Benchmark(state.clone()))
                .with_message(err.to_string());
            self.core.dispatch(&mut error, len);
        }
        self.core.dispatch(event, len);
        if event.aborted || self.core.signal.is_requested() {
            self.core.abort(members, false);
        }
        event.aborted = self.core.aborted;
    }

    fn on_complete(&mut self, event: &mut Event, members: &mut Vec<Benchmark>) {
        self.core.running = false;
        self.core.dispatch(event, members.len());
    }
}

/// An ordered collection of benchmarks run as a unit.
///
/// # Example
///
/// ```
/// use hzbench_sdk::{BenchOptions, Calibrator, Filter, HarnessConfig, Operation, Suite};
/// use std::hint::black_box;
/// use std::sync::Arc;
///
/// let config = HarnessConfig {
///     benchmark: BenchOptions { max_time: 0.02, min_samples: 2, ..BenchOptions::default() },
///     ..HarnessConfig::default()
/// };
/// let mut suite = Suite::from_config("sums", &config, Arc::new(Calibrator::system()?));
/// suite.add_operation("short", Operation::new(|| { black_box((0..16u64).sum::<u64>()); }))?;
/// suite.add_operation("long", Operation::new(|| { black_box((0..4096u64).sum::<u64>()); }))?;
///
/// suite.run()?;
/// let fastest = suite.filter(Filter::Fastest);
/// assert!(!fastest.is_empty());
/// # Ok::<(), hzbench_sdk::BenchError>(())
/// ```
pub struct Suite {
    core: SuiteCore,
    benchmarks: Vec<Benchmark>,
    queued: bool,
    defaults: BenchOptions,
    calibrator: Option<Arc<Calibrator>>,
}

impl Suite {
    /// Creates an empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: SuiteCore {
                name: name.into(),
                running: false,
                aborted: false,
                events: Emitter::new(),
                signal: Arc::new(AbortSignal::new()),
            },
            benchmarks: Vec::new(),
            queued: false,
            defaults: BenchOptions::default(),
            calibrator: None,
        }
    }

    /// Creates an empty suite whose [`add_operation`](Self::add_operation)
    /// uses `config`'s benchmark options and the shared `calibrator`.
    pub fn from_config(
        name: impl Into<String>,
        config: &HarnessConfig,
        calibrator: Arc<Calibrator>,
    ) -> Self {
        let mut suite = Self::new(name).with_queued(config.suite.queued);
        suite.defaults = config.benchmark.clone();
        suite.calibrator = Some(calibrator);
        suite
    }

    /// Removes members from the front of the suite as they finish during a
    /// run. They are put back once the run ends.
    pub fn with_queued(mut self, queued: bool) -> Self {
        self.queued = queued;
        self
    }

    /// Adds `bench` to the end of the suite.
    ///
    /// Emits a cancellable `add` event first. Returns `false` if a listener
    /// cancelled it, in which case `bench` is dropped.
    pub fn add(&mut self, bench: Benchmark) -> bool {
        let mut event = Event::new(EventKind::Add).with_target(bench.target());
        self.core.dispatch(&mut event, self.benchmarks.len());
        if event.cancelled {
            debug!(suite = %self.core.name, benchmark = %bench.name(), "add cancelled");
            return false;
        }
        self.benchmarks.push(bench);
        true
    }

    /// Creates a benchmark from the suite's default options and adds it.
    ///
    /// Calibrates the system clock on first use unless the suite was given a
    /// calibrator.
    ///
    /// # Errors
    ///
    /// Fails if the default options are invalid or calibration fails.
    pub fn add_operation(
        &mut self,
        name: impl Into<String>,
        operation: Operation,
    ) -> Result<bool, BenchError> {
        let calibrator = match &self.calibrator {
            Some(calibrator) => Arc::clone(calibrator),
            None => {
                let calibrator = Arc::new(Calibrator::system()?);
                self.calibrator = Some(Arc::clone(&calibrator));
                calibrator
            }
        };
        let bench = Benchmark::with_options(name, operation, calibrator, self.defaults.clone())?;
        Ok(self.add(bench))
    }

    /// Runs every member in order on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::DeferredRequiresAsync`] without running anything
    /// if a member has a deferred operation.
    pub fn run(&mut self) -> Result<(), BenchError> {
        if let Some(bench) = self.benchmarks.iter().find(|bench| bench.options.deferred) {
            return Err(BenchError::DeferredRequiresAsync {
                name: bench.name().to_string(),
            });
        }
        if !self.begin() {
            return Ok(());
        }
        let invocation = Invoke::new(SuiteHooks { core: &mut self.core })
            .queued(self.queued)
            .run(&mut self.benchmarks, |bench| {
                if bench.begin() {
                    bench.sample();
                }
            });
        self.finish(invocation.dequeued);
        Ok(())
    }

    /// Runs every member in order on the current async runtime.
    ///
    /// Asynchronous members are preceded by their `delay`.
    pub async fn run_async(&mut self) {
        if !self.begin() {
            return;
        }
        let invocation = Invoke::new(SuiteHooks { core: &mut self.core })
            .queued(self.queued)
            .run_async(&mut self.benchmarks, |bench| Box::pin(bench.run_async()))
            .await;
        self.finish(invocation.dequeued);
    }

    fn begin(&mut self) -> bool {
        self.reset();
        self.core.running = true;
        self.core.signal.clear();
        if self.benchmarks.is_empty() {
            self.core.running = false;
            let mut event = Event::new(EventKind::Complete);
            self.core.dispatch(&mut event, 0);
            return false;
        }
        for bench in &mut self.benchmarks {
            bench.set_parent(Some(Arc::clone(&self.core.signal)));
        }
        debug!(
            suite = %self.core.name,
            members = self.benchmarks.len(),
            queued = self.queued,
            "suite started"
        );
        true
    }

    fn finish(&mut self, mut dequeued: Vec<Benchmark>) {
        if !dequeued.is_empty() {
            dequeued.append(&mut self.benchmarks);
            self.benchmarks = dequeued;
        }
        for bench in &mut self.benchmarks {
            bench.set_parent(None);
        }
        debug!(suite = %self.core.name, aborted = self.core.aborted, "suite finished");
    }

    /// Aborts a running suite and its running member.
    ///
    /// Emits a cancellable `abort` event first. Does nothing when the suite
    /// is not running.
    pub fn abort(&mut self) {
        self.core.abort(&mut self.benchmarks, false);
    }

    /// Clears the suite's aborted state and resets its members.
    ///
    /// Emits a cancellable `reset` event first, and only when the suite was
    /// aborted. A running suite is aborted instead.
    pub fn reset(&mut self) {
        self.core.restore(&mut self.benchmarks, false);
    }

    /// Returns a handle that aborts the suite from outside the run.
    ///
    /// The member currently running stops at its next cycle boundary and the
    /// suite aborts once it finishes.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(Arc::clone(&self.core.signal))
    }

    /// Members matching `criteria`, in the order [`filter`] returns them.
    pub fn filter(&self, criteria: Filter) -> Vec<&Benchmark> {
        filter(&self.benchmarks, criteria)
    }

    /// Registers a listener.
    pub fn on<F, R>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        self.core.events.on(kind, listener)
    }

    /// Removes one listener, or all listeners of `kind` when `id` is `None`.
    pub fn off(&mut self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.core.events.off(kind, id)
    }

    /// The listeners registered for `kind`.
    pub fn listeners(&mut self, kind: EventKind) -> &mut Vec<Listener> {
        self.core.events.listeners(kind)
    }

    /// Emits `event` to the suite's listeners.
    pub fn emit(&mut self, event: impl Into<Event>) -> Option<Flow> {
        let mut event = event.into();
        self.core.dispatch(&mut event, self.benchmarks.len());
        event.result
    }

    /// A summary of this suite as an event target.
    pub fn target(&self) -> Target {
        Target::Suite(self.core.info(self.benchmarks.len()))
    }

    /// Member benchmarks in insertion order.
    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    /// Looks up a member by name.
    pub fn get(&self, name: &str) -> Option<&Benchmark> {
        self.benchmarks.iter().find(|bench| bench.name() == name)
    }

    /// Number of member benchmarks.
    pub fn len(&self) -> usize {
        self.benchmarks.len()
    }

    /// Whether the suite has no members.
    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.core.running
    }

    /// Whether the last run was aborted.
    pub fn is_aborted(&self) -> bool {
        self.core.aborted
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.core.name)
            .field("running", &self.core.running)
            .field("aborted", &self.core.aborted)
            .field("queued", &self.queued)
            .field("benchmarks", &self.benchmarks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn calibrator(clock: &ManualClock) -> Arc<Calibrator> {
        Arc::new(Calibrator::with_resolution(Arc::new(clock.clone()), 1e-3).unwrap())
    }

    fn quick() -> BenchOptions {
        BenchOptions {
            min_time: 0.01,
            max_time: 0.02,
            min_samples: 2,
            ..BenchOptions::default()
        }
    }

    fn member(clock: &ManualClock, name: &str, millis: u64) -> Benchmark {
        let cost = clock.clone();
        Benchmark::with_options(
            name,
            Operation::new(move || cost.advance(Duration::from_millis(millis))),
            calibrator(clock),
            quick(),
        )
        .unwrap()
    }

    fn failing(clock: &ManualClock, name: &str) -> Benchmark {
        Benchmark::with_options(
            name,
            Operation::fallible(|| Err::<(), _>("boom")),
            calibrator(clock),
            quick(),
        )
        .unwrap()
    }

    /// Records `kind:target` for every suite event.
    fn record(suite: &mut Suite) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            EventKind::Start,
            EventKind::Cycle,
            EventKind::Error,
            EventKind::Abort,
            EventKind::Reset,
            EventKind::Complete,
        ] {
            let log = Arc::clone(&log);
            suite.on(kind, move |event: &mut Event| {
                let name = event.target.as_ref().map(|t| t.name().to_string()).unwrap_or_default();
                log.lock().unwrap().push(format!("{}:{}", event.kind, name));
            });
        }
        log
    }

    #[test]
    fn runs_members_in_order() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("ordered");
        suite.add(member(&clock, "a", 1));
        suite.add(member(&clock, "b", 2));
        let log = record(&mut suite);

        suite.run().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start:a", "cycle:a", "cycle:b", "complete:b"]
        );
        assert!(!suite.is_running());
        assert!(!suite.is_aborted());
        assert!(suite.benchmarks().iter().all(|bench| bench.stats().len() >= 2));
    }

    #[test]
    fn failing_member_does_not_stop_the_suite() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("resilient");
        suite.add(member(&clock, "a", 1));
        suite.add(failing(&clock, "b"));
        suite.add(member(&clock, "c", 1));
        let log = record(&mut suite);

        suite.run().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "start:a",
                "cycle:a",
                "error:b",
                "cycle:b",
                "cycle:c",
                "complete:c"
            ]
        );
        assert!(suite.get("b").unwrap().error().is_some());
        assert!(!suite.get("c").unwrap().stats().is_empty());
        assert_eq!(suite.filter(Filter::Successful).len(), 2);
    }

    #[test]
    fn aborting_a_cycle_skips_remaining_members() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("stopped");
        for name in ["a", "b", "c"] {
            suite.add(member(&clock, name, 1));
        }
        let log = record(&mut suite);
        let mut cycles = 0;
        suite.on(EventKind::Cycle, move |event: &mut Event| {
            cycles += 1;
            if cycles == 2 {
                event.abort();
            }
        });

        suite.run().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "start:a",
                "cycle:a",
                "cycle:b",
                "abort:stopped",
                "reset:stopped",
                "complete:b"
            ]
        );
        assert!(suite.is_aborted());
        assert!(!suite.is_running());
        assert!(suite.get("c").unwrap().stats().is_empty());
    }

    #[test]
    fn cancelled_abort_keeps_running() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("stubborn");
        for name in ["a", "b", "c"] {
            suite.add(member(&clock, name, 1));
        }
        suite.on(EventKind::Cycle, |event: &mut Event| event.abort());
        suite.on(EventKind::Abort, |_: &mut Event| false);

        suite.run().unwrap();

        assert!(!suite.is_aborted());
        assert!(suite.benchmarks().iter().all(|bench| !bench.stats().is_empty()));
    }

    #[test]
    fn abort_handle_stops_the_suite() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("handled");
        let handle = suite.abort_handle();
        let cost = clock.clone();
        let trigger = Benchmark::with_options(
            "trigger",
            Operation::new(move || {
                cost.advance(Duration::from_millis(1));
                handle.abort();
            }),
            calibrator(&clock),
            quick(),
        )
        .unwrap();
        suite.add(trigger);
        suite.add(member(&clock, "skipped", 1));
        let log = record(&mut suite);

        suite.run().unwrap();

        assert!(suite.is_aborted());
        assert!(suite.get("trigger").unwrap().is_aborted());
        assert!(suite.get("skipped").unwrap().stats().is_empty());
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|l| l.starts_with("cycle")).count(), 1);
        assert_eq!(log.last().map(String::as_str), Some("complete:trigger"));
    }

    #[test]
    fn reset_after_abort_restores_members() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("restored");
        suite.add(member(&clock, "a", 1));
        suite.add(member(&clock, "b", 1));
        suite.on(EventKind::Cycle, |event: &mut Event| event.abort());
        suite.run().unwrap();
        assert!(suite.is_aborted());
        assert!(!suite.get("a").unwrap().stats().is_empty());

        suite.reset();
        assert!(!suite.is_aborted());
        assert!(suite.get("a").unwrap().stats().is_empty());

        // Idle and not aborted: nothing to do.
        let log = record(&mut suite);
        suite.reset();
        suite.abort();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn cancelled_add_drops_the_benchmark() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("picky");
        suite.on(EventKind::Add, |event: &mut Event| {
            event.target.as_ref().map(|t| t.name()) != Some("rejected")
        });

        assert!(suite.add(member(&clock, "kept", 1)));
        assert!(!suite.add(member(&clock, "rejected", 1)));
        assert_eq!(suite.len(), 1);
        assert!(suite.get("rejected").is_none());
    }

    #[test]
    fn accessors_follow_membership_and_run_state() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("observed");
        assert_eq!(suite.name(), "observed");
        assert!(suite.is_empty());
        assert_eq!(suite.len(), 0);

        suite.add(member(&clock, "a", 1));
        suite.add(member(&clock, "b", 1));
        assert!(!suite.is_empty());
        assert_eq!(suite.len(), 2);
        assert!(!suite.is_running());
        assert!(!suite.is_aborted());

        suite.on(EventKind::Cycle, |event: &mut Event| event.abort());
        suite.run().unwrap();
        assert!(!suite.is_running());
        assert!(suite.is_aborted());
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn empty_suite_completes() {
        let mut suite = Suite::new("empty");
        let log = record(&mut suite);
        suite.run().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["complete:empty"]);
        assert!(!suite.is_running());
    }

    #[test]
    fn deferred_member_needs_async_run() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("mixed");
        suite.add(member(&clock, "sync", 1));
        suite.add(Benchmark::new(
            "later",
            Operation::deferred(|handle| handle.resolve()),
            calibrator(&clock),
        ));
        let log = record(&mut suite);

        assert!(matches!(
            suite.run(),
            Err(BenchError::DeferredRequiresAsync { name }) if name == "later"
        ));
        assert!(log.lock().unwrap().is_empty());
        assert!(suite.get("sync").unwrap().stats().is_empty());
    }

    #[test]
    fn queued_run_puts_members_back() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("queue").with_queued(true);
        for name in ["a", "b", "c"] {
            suite.add(member(&clock, name, 1));
        }
        let lens = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&lens);
        suite.on(EventKind::Cycle, move |event: &mut Event| {
            if let Some(Target::Suite(info)) = &event.current_target {
                seen.lock().unwrap().push(info.len);
            }
        });

        suite.run().unwrap();

        // The finished member is still at the front when its cycle fires.
        assert_eq!(*lens.lock().unwrap(), vec![3, 2, 1]);
        let names: Vec<&str> = suite.benchmarks().iter().map(Benchmark::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn from_config_applies_defaults() {
        let clock = ManualClock::new();
        let mut config = HarnessConfig::default();
        config.benchmark.min_samples = 3;
        config.suite.queued = true;
        let mut suite = Suite::from_config("configured", &config, calibrator(&clock));
        let cost = clock.clone();
        suite
            .add_operation("op", Operation::new(move || cost.advance(Duration::from_millis(1))))
            .unwrap();

        assert!(suite.queued);
        assert_eq!(suite.get("op").unwrap().options().min_samples, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn async_run_awaits_deferred_members() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("deferred");
        let cost = clock.clone();
        suite.add(
            Benchmark::with_options(
                "resolved",
                Operation::deferred(move |handle| {
                    cost.advance(Duration::from_millis(1));
                    handle.resolve();
                }),
                calibrator(&clock),
                quick(),
            )
            .unwrap(),
        );
        suite.add(member(&clock, "plain", 1));
        let log = record(&mut suite);

        suite.run_async().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start:resolved", "cycle:resolved", "cycle:plain", "complete:plain"]
        );
        let resolved = suite.get("resolved").unwrap();
        assert!(resolved.stats().len() >= 2);
        assert!((resolved.stats().mean - 0.001).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn member_vetoing_a_suite_abort_finishes_its_run() {
        let clock = ManualClock::new();
        let mut suite = Suite::new("vetoed");
        let handle = suite.abort_handle();
        let cost = clock.clone();
        let mut held = Benchmark::with_options(
            "held",
            Operation::deferred(move |completion| {
                cost.advance(Duration::from_millis(1));
                handle.abort();
                completion.resolve();
            }),
            calibrator(&clock),
            quick(),
        )
        .unwrap();
        let vetoes = Arc::new(Mutex::new(0usize));
        let seen = Arc::clone(&vetoes);
        held.on(EventKind::Abort, move |_: &mut Event| {
            *seen.lock().unwrap() += 1;
            false
        });
        suite.add(held);
        suite.add(member(&clock, "skipped", 1));

        suite.run_async().await;

        // The member is asked once, then runs to completion unhindered.
        assert_eq!(*vetoes.lock().unwrap(), 1);
        let held = suite.get("held").unwrap();
        assert!(!held.is_aborted());
        assert!(held.stats().len() >= 2);
        assert!(!held.stats().sample.contains(&0.0));
        assert!(suite.is_aborted());
        assert!(suite.get("skipped").unwrap().stats().is_empty());
    }
}
