//! Cycle controller.
//!
//! One sampling round (a [`Trial`]) times the operation `count` times in a
//! single region, then grows `count` until a region lasts at least the
//! benchmark's minimum time. The period of the final region is the round's
//! sample.
//!
//! Growth follows `count += ceil((min_time - elapsed) / period)`. A region
//! that clocks zero gets a fixed boost for its first few cycles instead, and
//! a count that cannot be bounded marks the operation unmeasurable.

use crate::benchmark::Benchmark;
use crate::event::{Event, EventKind};
use crate::operation::Clocked;
use crate::signal::{AbortSignal, either_requested};
use crate::types::RunError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Iterations targeted by the zero-elapsed boost, before dividing.
const ZERO_ELAPSED_BOOST: f64 = 4e6;

/// Divisor of the zero-elapsed boost for a 1-based cycle number. A divisor of
/// zero means the count is unbounded.
fn zero_elapsed_divisor(cycle: u32) -> Option<u32> {
    match cycle {
        1 => Some(4096),
        2 => Some(512),
        3 => Some(64),
        4 => Some(8),
        5 => Some(0),
        _ => None,
    }
}

/// What to do after a timed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Growth {
    /// The region was long enough.
    Settled,
    /// Time another region with this many iterations.
    Grow(u64),
    /// No finite count will reach the minimum time.
    Unbounded,
}

/// Decides the next iteration count after `cycle` timed `count` iterations in
/// `clocked` seconds.
pub(crate) fn next_count(count: u64, cycle: u32, clocked: f64, min_time: f64) -> Growth {
    if clocked >= min_time {
        return Growth::Settled;
    }
    let current = count as f64;
    let period = clocked / current;
    let mut next = current;

    if clocked == 0.0 {
        match zero_elapsed_divisor(cycle) {
            Some(0) => next = f64::INFINITY,
            Some(divisor) => next = (ZERO_ELAPSED_BOOST / f64::from(divisor)).floor(),
            None => {}
        }
    }
    if next <= current {
        next += ((min_time - clocked) / period).ceil();
    }

    if !next.is_finite() || next >= u64::MAX as f64 {
        Growth::Unbounded
    } else {
        Growth::Grow(next as u64)
    }
}

/// One sampling round.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Trial {
    /// Iterations per timed region.
    pub count: u64,
    /// Timed regions so far.
    pub cycles: u32,
    /// Whether another region should be timed.
    pub running: bool,
    /// Seconds per operation in the last region.
    pub period: f64,
    /// Operations per second in the last region.
    pub hz: f64,
    /// Duration of the last region.
    pub clocked: f64,
    /// Clock reading when the round started.
    pub timestamp: f64,
    /// The count could not be bounded.
    pub unmeasurable: bool,
}

impl Trial {
    pub(crate) fn start(count: u64, timestamp: f64) -> Self {
        Self {
            count: count.max(1),
            running: true,
            timestamp,
            ..Self::default()
        }
    }
}

/// Sleeps for `delay`. An abort request on either signal cuts the sleep
/// short.
pub(crate) async fn pause(delay: Duration, own: &AbortSignal, parent: Option<&AbortSignal>) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = either_requested(own, parent) => {}
    }
}

impl Benchmark {
    /// Times regions for `trial` until its count settles.
    pub(crate) fn run_trial(&mut self, trial: &mut Trial) {
        loop {
            let clocked = if self.enter_cycle(trial) {
                Some(self.operation.time_sync(trial.count, &self.calibrator))
            } else {
                None
            };
            if !self.finish_cycle(trial, clocked) {
                break;
            }
        }
    }

    /// Async counterpart of [`run_trial`](Self::run_trial). Pauses for
    /// `options.delay` between regions when the options are asynchronous.
    pub(crate) async fn run_trial_async(&mut self, trial: &mut Trial) {
        let own = Arc::clone(&self.signal);
        loop {
            let clocked = if self.enter_cycle(trial) {
                // Read after entering: a vetoed abort detaches the parent.
                let parent = self.parent.clone();
                let clocked = self
                    .operation
                    .time_async(trial.count, &self.calibrator, &own, parent.as_deref())
                    .await;
                Some(clocked)
            } else {
                None
            };
            if !self.finish_cycle(trial, clocked) {
                break;
            }
            if self.options.is_async() {
                pause(self.options.delay_duration(), &own, self.parent.as_deref()).await;
            }
        }
    }

    /// Honors pending abort requests and reports whether `trial` should time
    /// another region.
    fn enter_cycle(&mut self, trial: &mut Trial) -> bool {
        if self.abort_requested() {
            self.abort();
        }
        if !self.state.running || self.state.aborted {
            trial.running = false;
        }
        if trial.running {
            trial.cycles += 1;
            self.state.count = trial.count;
        }
        trial.running
    }

    /// Applies the outcome of a region. Returns whether the trial continues.
    fn finish_cycle(&mut self, trial: &mut Trial, clocked: Option<Clocked>) -> bool {
        let mut elapsed = 0.0;
        if let Some(clocked) = clocked {
            self.state.cycles = self.state.cycles.max(trial.cycles);
            match clocked {
                Clocked::Timed(seconds) => elapsed = seconds,
                Clocked::Failed(err) => {
                    warn!(name = %self.state.name, error = %err, "operation failed");
                    let message = err.to_string();
                    self.state.error = Some(err);
                    let event = self.fire(Event::new(EventKind::Error).with_message(message));
                    if !event.cancelled {
                        self.abort_trial(trial);
                    }
                }
                Clocked::Interrupted => self.abort_trial(trial),
            }
        }

        if trial.running {
            let count = trial.count;
            let period = elapsed / count as f64;
            trial.clocked = elapsed;
            trial.period = period;
            trial.hz = 1.0 / period;
            self.state.times.cycle = elapsed;
            self.state.times.period = period;
            self.state.hz = trial.hz;
            trace!(
                name = %self.state.name,
                cycle = trial.cycles,
                count,
                elapsed,
                period,
                "cycle timed"
            );

            match next_count(count, trial.cycles, elapsed, self.min_time()) {
                Growth::Settled => trial.running = false,
                Growth::Grow(next) => {
                    debug!(name = %self.state.name, from = count, to = next, "growing count");
                    trial.count = next;
                }
                Growth::Unbounded => {
                    let err = RunError::Unmeasurable { count };
                    warn!(name = %self.state.name, count, "operation cannot be measured");
                    trial.running = false;
                    trial.unmeasurable = true;
                    let message = err.to_string();
                    self.state.error = Some(err);
                    self.fire(Event::new(EventKind::Error).with_message(message));
                }
            }
        }

        let event = self.fire(Event::new(EventKind::Cycle));
        if event.aborted {
            self.abort_trial(trial);
        }
        trial.running
    }

    /// Aborts the benchmark. The trial stops only if the abort went through;
    /// a vetoed abort keeps it cycling.
    fn abort_trial(&mut self, trial: &mut Trial) {
        self.abort();
        if !self.state.running || self.state.aborted {
            trial.running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use crate::options::BenchOptions;
    use crate::timing::{Calibrator, ManualClock};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn bench_with(op: Operation, clock: &ManualClock, min_time: f64) -> Benchmark {
        let calibrator =
            Arc::new(Calibrator::with_resolution(Arc::new(clock.clone()), 1e-3).unwrap());
        let options = BenchOptions {
            min_time,
            ..BenchOptions::default()
        };
        let mut bench = Benchmark::with_options("cycle", op, calibrator, options).unwrap();
        bench.state.running = true;
        bench
    }

    #[test]
    fn growth_reaches_min_time() {
        // period 0.25s, 0.75s short: three more iterations
        assert_eq!(next_count(1, 1, 0.25, 1.0), Growth::Grow(4));
        assert_eq!(next_count(4, 2, 1.0, 1.0), Growth::Settled);
        assert_eq!(next_count(10, 2, 1.5, 1.0), Growth::Settled);
    }

    #[test]
    fn zero_elapsed_boost_shrinks_per_cycle() {
        assert_eq!(next_count(1, 1, 0.0, 0.05), Growth::Grow(976));
        assert_eq!(next_count(976, 2, 0.0, 0.05), Growth::Grow(7812));
        assert_eq!(next_count(7812, 3, 0.0, 0.05), Growth::Grow(62500));
        assert_eq!(next_count(62500, 4, 0.0, 0.05), Growth::Grow(500000));
        assert_eq!(next_count(500000, 5, 0.0, 0.05), Growth::Unbounded);
        assert_eq!(next_count(500000, 6, 0.0, 0.05), Growth::Unbounded);
    }

    #[test]
    fn boost_below_current_count_is_unbounded() {
        // A carried-over count already past the boost cannot grow from zero.
        assert_eq!(next_count(5000, 1, 0.0, 0.05), Growth::Unbounded);
    }

    #[test]
    fn trial_grows_until_region_is_long_enough() {
        let clock = ManualClock::new();
        let cost = clock.clone();
        let mut bench = bench_with(
            Operation::new(move || cost.advance(Duration::from_millis(1))),
            &clock,
            0.1,
        );
        let regions = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&regions);
        bench.on(EventKind::Cycle, move |event: &mut Event| {
            let state = event.target.as_ref().and_then(|t| t.as_benchmark()).unwrap();
            seen.lock().unwrap().push((state.count, state.times.cycle));
        });

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        let regions = regions.lock().unwrap();
        assert!(regions.len() >= 2);
        assert_eq!(regions[0].0, 1);
        let &(count, cycle) = regions.last().unwrap();
        assert!(count >= 100);
        assert!(cycle >= 0.1 - 1e-9);
        assert!((trial.period - 0.001).abs() < 1e-9);
        assert_eq!(bench.state.cycles, trial.cycles);
        assert!(!trial.unmeasurable);
    }

    #[test]
    fn free_operation_is_unmeasurable() {
        let clock = ManualClock::new();
        let mut bench = bench_with(Operation::new(|| {}), &clock, 0.05);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&errors);
        bench.on(EventKind::Error, move |event: &mut Event| {
            seen.lock().unwrap().push(event.message.clone());
        });

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        assert!(trial.unmeasurable);
        assert_eq!(trial.cycles, 5);
        assert!(matches!(
            bench.state.error,
            Some(RunError::Unmeasurable { count: 500000 })
        ));
        assert!(!bench.state.aborted);
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn failure_aborts_unless_cancelled() {
        let clock = ManualClock::new();
        let mut bench = bench_with(
            Operation::fallible(|| Err::<(), _>("broken")),
            &clock,
            0.05,
        );
        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        assert!(bench.state.aborted);
        assert!(!bench.state.running);
        assert_eq!(
            bench.state.error,
            Some(RunError::Operation("broken".into()))
        );
    }

    #[test]
    fn cancelled_failure_keeps_cycling() {
        let clock = ManualClock::new();
        let attempts = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&attempts);
        let cost = clock.clone();
        let mut bench = bench_with(
            Operation::fallible(move || {
                cost.advance(Duration::from_millis(10));
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("flaky")
                } else {
                    Ok(())
                }
            }),
            &clock,
            0.05,
        );
        bench.on(EventKind::Error, |_: &mut Event| false);

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        assert!(!bench.state.aborted);
        assert!(bench.state.running);
        assert!(!trial.unmeasurable);
        assert!(trial.clocked >= 0.05 - 1e-9);
    }

    fn flaky_on_first_call(clock: &ManualClock) -> Operation {
        let cost = clock.clone();
        let calls = AtomicU64::new(0);
        Operation::fallible(move || {
            cost.advance(Duration::from_millis(1));
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("flaky")
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn vetoed_failure_abort_keeps_zero_periods_out_of_the_sample() {
        let clock = ManualClock::new();
        let calibrator =
            Arc::new(Calibrator::with_resolution(Arc::new(clock.clone()), 1e-3).unwrap());
        let options = BenchOptions {
            min_time: 0.01,
            max_time: 0.0,
            min_samples: 3,
            ..BenchOptions::default()
        };
        let mut bench =
            Benchmark::with_options("flaky", flaky_on_first_call(&clock), calibrator, options)
                .unwrap();
        bench.on(EventKind::Abort, |_: &mut Event| false);

        bench.run().unwrap();

        let sample = &bench.stats().sample;
        assert_eq!(sample.len(), 3);
        assert!(!sample.contains(&0.0), "{sample:?}");
        assert!((bench.hz() - 1000.0).abs() < 1e-3, "{}", bench.hz());
        assert!(!bench.is_aborted());
        assert!(!bench.is_running());
    }

    #[test]
    fn vetoed_failure_abort_grows_the_count_instead_of_stopping() {
        let clock = ManualClock::new();
        let mut bench = bench_with(flaky_on_first_call(&clock), &clock, 0.01);
        bench.on(EventKind::Abort, |_: &mut Event| false);

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        assert!(trial.cycles >= 2);
        assert!(trial.count > 1);
        assert!((trial.period - 0.001).abs() < 1e-9);
        assert!(bench.state.running);
        assert!(!bench.state.aborted);
    }

    #[test]
    fn vetoed_handle_request_is_consumed() {
        let clock = ManualClock::new();
        let cost = clock.clone();
        let bench_handle = Arc::new(Mutex::new(None::<crate::signal::AbortHandle>));
        let slot = Arc::clone(&bench_handle);
        let calls = Arc::new(AtomicU64::new(0));
        let counted = Arc::clone(&calls);
        let calibrator =
            Arc::new(Calibrator::with_resolution(Arc::new(clock.clone()), 1e-3).unwrap());
        let options = BenchOptions {
            min_time: 0.01,
            max_time: 0.0,
            min_samples: 3,
            ..BenchOptions::default()
        };
        let mut bench = Benchmark::with_options(
            "vetoed",
            Operation::new(move || {
                cost.advance(Duration::from_millis(1));
                if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                    if let Some(handle) = slot.lock().unwrap().as_ref() {
                        handle.abort();
                    }
                }
            }),
            calibrator,
            options,
        )
        .unwrap();
        *bench_handle.lock().unwrap() = Some(bench.abort_handle());
        let vetoes = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&vetoes);
        bench.on(EventKind::Abort, move |_: &mut Event| {
            seen.fetch_add(1, Ordering::SeqCst);
            false
        });

        bench.run().unwrap();

        assert_eq!(vetoes.load(Ordering::SeqCst), 1);
        assert!(!bench.abort_handle().is_abort_requested());
        assert_eq!(bench.stats().len(), 3);
        assert!(!bench.stats().sample.contains(&0.0));
        assert!(!bench.is_aborted());
    }

    #[test]
    fn aborting_a_cycle_event_stops_the_trial() {
        let clock = ManualClock::new();
        let cost = clock.clone();
        let mut bench = bench_with(
            Operation::new(move || cost.advance(Duration::from_millis(1))),
            &clock,
            1.0,
        );
        bench.on(EventKind::Cycle, |event: &mut Event| event.abort());

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        assert_eq!(trial.cycles, 1);
        assert!(bench.state.aborted);
    }

    #[test]
    fn abort_handle_is_honored_at_cycle_boundary() {
        let clock = ManualClock::new();
        let cost = clock.clone();
        let bench_handle = Arc::new(Mutex::new(None::<crate::signal::AbortHandle>));
        let slot = Arc::clone(&bench_handle);
        let calls = Arc::new(AtomicU64::new(0));
        let counted = Arc::clone(&calls);
        let mut bench = bench_with(
            Operation::new(move || {
                cost.advance(Duration::from_millis(1));
                if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                    if let Some(handle) = slot.lock().unwrap().as_ref() {
                        handle.abort();
                    }
                }
            }),
            &clock,
            1.0,
        );
        *bench_handle.lock().unwrap() = Some(bench.abort_handle());

        let mut trial = Trial::start(1, 0.0);
        bench.run_trial(&mut trial);

        // The first region finishes; the request stops the second.
        assert_eq!(trial.cycles, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(bench.state.aborted);
    }
}
