//! Clock sources and calibration.
//!
//! Every measurement in the harness is taken against a [`Clock`]. Before any
//! benchmark runs, a [`Calibrator`] measures the clock's resolution once and
//! derives the minimum duration a timed region must last for one tick of
//! resolution to stay below 1% of the measured interval.
//!
//! The calibrator is an explicit value: construct one, wrap it in an [`Arc`],
//! and hand it to every benchmark that should share it.
//!
//! ```
//! use hzbench_sdk::timing::{Calibrator, MIN_RUN_DURATION_FLOOR};
//!
//! let calibrator = Calibrator::system()?;
//! assert!(calibrator.resolution() > 0.0);
//! assert!(calibrator.minimum_run_duration() >= MIN_RUN_DURATION_FLOOR);
//! # Ok::<(), hzbench_sdk::BenchError>(())
//! ```
//!
//! ## Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Clock`] | Monotonic timestamp source |
//! | [`SystemClock`] | [`std::time::Instant`]-backed clock |
//! | [`ManualClock`] | Deterministic clock advanced explicitly (tests, simulations) |
//! | [`Calibrator`] | Measured resolution and minimum run duration |

use crate::types::BenchError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Number of nonzero clock deltas averaged to estimate resolution.
pub const RESOLUTION_SAMPLES: usize = 30;

/// Relative measurement uncertainty the minimum run duration is derived for.
pub const TARGET_UNCERTAINTY: f64 = 0.01;

/// Lower bound on the minimum run duration (seconds).
pub const MIN_RUN_DURATION_FLOOR: f64 = 0.05;

/// Reads of an unchanging clock tolerated before it is declared broken.
const MAX_STALLED_READS: u64 = 10_000_000;

/// A monotonic timestamp source.
///
/// Timestamps are offsets from an arbitrary origin fixed for the life of the
/// clock. Implementations must never go backwards.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current timestamp.
    fn now(&self) -> Duration;
}

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that only moves when told to.
///
/// Clones share the same underlying time, so a workload closure can hold one
/// clone and advance it to simulate cost while the harness reads another.
///
/// ```
/// use hzbench_sdk::timing::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// handle.advance(Duration::from_millis(3));
/// assert_eq!(clock.now(), Duration::from_millis(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// A calibrated clock.
///
/// Holds the clock together with its measured resolution and the minimum run
/// duration derived from it. Calibration happens once, at construction.
#[derive(Debug, Clone)]
pub struct Calibrator {
    clock: Arc<dyn Clock>,
    resolution: f64,
    min_run_duration: f64,
}

impl Calibrator {
    /// Calibrates `clock` by measuring its resolution.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::NoUsableClock`] if the clock never advances.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, BenchError> {
        let resolution = measure_resolution(clock.as_ref());
        Self::with_resolution(clock, resolution)
    }

    /// Calibrates a fresh [`SystemClock`].
    pub fn system() -> Result<Self, BenchError> {
        Self::new(Arc::new(SystemClock::new()))
    }

    /// Builds a calibrator for a clock whose resolution is already known.
    ///
    /// Useful for simulated clocks, which only advance when the workload does
    /// and therefore cannot be measured by spinning.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::NoUsableClock`] if `resolution` is not a positive,
    /// finite number of seconds.
    pub fn with_resolution(clock: Arc<dyn Clock>, resolution: f64) -> Result<Self, BenchError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(BenchError::NoUsableClock { resolution });
        }
        let min_run_duration = run_duration_for(resolution, TARGET_UNCERTAINTY);
        debug!(resolution, min_run_duration, "clock calibrated");
        Ok(Self {
            clock,
            resolution,
            min_run_duration,
        })
    }

    /// The clock's resolution in seconds.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Minimum duration of a timed region (seconds) for 1% uncertainty.
    pub fn minimum_run_duration(&self) -> f64 {
        self.min_run_duration
    }

    /// Minimum duration of a timed region (seconds) for an arbitrary target
    /// relative uncertainty, never below [`MIN_RUN_DURATION_FLOOR`].
    pub fn minimum_run_duration_for(&self, target_uncertainty: f64) -> f64 {
        run_duration_for(self.resolution, target_uncertainty)
    }

    /// The calibrated clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Current clock reading in seconds.
    pub(crate) fn now_secs(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }
}

fn run_duration_for(resolution: f64, target_uncertainty: f64) -> f64 {
    (resolution / 2.0 / target_uncertainty).max(MIN_RUN_DURATION_FLOOR)
}

/// Averages the smallest observable deltas of `clock`.
///
/// Returns infinity if the clock stalls or runs backwards.
fn measure_resolution(clock: &dyn Clock) -> f64 {
    let mut total = 0.0;
    for _ in 0..RESOLUTION_SAMPLES {
        let begin = clock.now();
        let mut reads = 0_u64;
        let delta = loop {
            let now = clock.now();
            if now < begin {
                break None;
            }
            let delta = now - begin;
            if !delta.is_zero() {
                break Some(delta);
            }
            reads += 1;
            if reads >= MAX_STALLED_READS {
                break None;
            }
        };
        match delta {
            Some(delta) => total += delta.as_secs_f64(),
            None => return f64::INFINITY,
        }
    }
    total / RESOLUTION_SAMPLES as f64
}
