//! Statistical sampler.
//!
//! Runs sampling rounds ([`Trial`]s) one after another, appending each
//! round's period to the benchmark's sample and recomputing its statistics.
//! Sampling stops once the sample holds at least `min_samples` periods and
//! more than `max_time` seconds have been spent in rounds. Pauses between
//! rounds are not counted.
//!
//! Each round starts at the count the previous round settled on, so only the
//! first round pays for growing the count from `init_count`.

use crate::benchmark::Benchmark;
use crate::cycle::{Trial, pause};
use crate::event::{Event, EventKind};
use std::sync::Arc;
use tracing::debug;

/// Most rounds queued at once, counting the one being evaluated.
pub const MAX_QUEUED: usize = 2;

/// Round queue and sampling-time accounting for one run.
///
/// Rounds carry no state until they start, so the queue is a count.
#[derive(Debug)]
pub(crate) struct Sampler {
    queued: usize,
    elapsed: f64,
}

impl Sampler {
    pub(crate) fn new() -> Self {
        Self {
            queued: 1,
            elapsed: 0.0,
        }
    }

    /// Takes the next queued round, if any.
    fn dequeue(&mut self) -> bool {
        if self.queued == 0 {
            return false;
        }
        self.queued -= 1;
        true
    }

    /// Folds a finished round into `bench`. Returns `true` when sampling is
    /// done.
    fn evaluate(&mut self, bench: &mut Benchmark, trial: &Trial) -> bool {
        let now = bench.calibrator.now_secs();
        let mut done = bench.state.aborted;
        let sample = &mut bench.state.stats.sample;
        sample.push(trial.period);
        let size = sample.len();
        // Rounds count toward max_time only once min_samples is reached.
        let enough = size >= bench.options.min_samples;
        if enough {
            self.elapsed += now - trial.timestamp;
        }
        let mut maxed_out = enough && self.elapsed > bench.options.max_time;

        if done || trial.unmeasurable || trial.hz.is_infinite() {
            sample.clear();
            self.queued = 0;
            maxed_out = true;
        }

        if !done {
            let state = &mut bench.state;
            state.stats.recompute();
            if maxed_out {
                state.running = false;
                state.times.elapsed = now - state.times.timestamp;
                done = true;
                debug!(
                    name = %state.name,
                    samples = state.stats.len(),
                    elapsed = self.elapsed,
                    rme = state.stats.rme,
                    "sampling finished"
                );
            }
            if state.hz.is_finite() && !state.stats.is_empty() {
                let mean = state.stats.mean;
                state.hz = 1.0 / mean;
                state.times.cycle = mean * state.count as f64;
                state.times.period = mean;
            }
        }

        // The evaluated round still counts toward the cap.
        if self.queued + 1 < MAX_QUEUED && !maxed_out {
            self.queued += 1;
        }
        done
    }
}

impl Benchmark {
    /// Samples synchronously until done, then emits `complete`.
    pub(crate) fn sample(&mut self) {
        let mut sampler = Sampler::new();
        while sampler.dequeue() {
            let mut trial = Trial::start(self.state.count, self.calibrator.now_secs());
            self.run_trial(&mut trial);
            if sampler.evaluate(self, &trial) {
                break;
            }
        }
        self.fire(Event::new(EventKind::Complete));
    }

    /// Samples on the async runtime until done, then emits `complete`.
    pub(crate) async fn sample_async(&mut self) {
        let own = Arc::clone(&self.signal);
        let mut sampler = Sampler::new();
        let mut first = true;
        while sampler.dequeue() {
            if !first && self.options.is_async() {
                pause(self.options.delay_duration(), &own, self.parent.as_deref()).await;
            }
            first = false;
            let mut trial = Trial::start(self.state.count, self.calibrator.now_secs());
            self.run_trial_async(&mut trial).await;
            if sampler.evaluate(self, &trial) {
                break;
            }
        }
        self.fire(Event::new(EventKind::Complete));
    }
}
