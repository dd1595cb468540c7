//! Adaptive micro-benchmark harness
//!
//! `hzbench-sdk` measures how many times per second a piece of code runs.
//! It calibrates the clock, grows the iteration count until a timed region is
//! long enough to measure accurately, samples until the result is
//! statistically stable, and compares benchmarks with a Mann-Whitney U test.
//!
//! # Quick Start
//!
//! ```
//! use hzbench_sdk::{Benchmark, Calibrator, Operation, Speed};
//! use std::hint::black_box;
//! use std::sync::Arc;
//!
//! let calibrator = Arc::new(Calibrator::system()?);
//!
//! let mut small = Benchmark::builder("small", Operation::new(|| {
//!     black_box((0..8u64).product::<u64>());
//! }))
//! .calibrator(Arc::clone(&calibrator))
//! .max_time(0.05)
//! .build()?;
//! small.run()?;
//!
//! println!("{} ops/sec ±{:.2}%", small.hz(), small.stats().rme);
//! assert_eq!(small.compare(&small), Speed::Same);
//! # Ok::<(), hzbench_sdk::BenchError>(())
//! ```
//!
//! # Architecture
//!
//! - **Timing**: [`Calibrator`] picks the clock resolution and minimum
//!   measurable duration
//! - **Cycles**: one timed region of `count` iterations, grown until it lasts
//!   long enough
//! - **Sampler**: repeats cycles until `min_samples` and `max_time` are met
//! - **Stats / Compare**: mean, margin of error and significance testing
//! - **Events**: every transition is an [`Event`] listeners can observe or
//!   veto
//! - **Suite**: runs benchmarks in sequence via the generic [`Invoke`]
//!   sequencer
//!
//! Deferred operations signal completion through a [`CompletionHandle`] and
//! require [`Benchmark::run_async`] or [`Suite::run_async`] on a tokio
//! runtime.

// Public modules
pub mod benchmark;
pub mod compare;
pub mod config;
pub mod deferred;
pub mod event;
pub mod invoke;
pub mod operation;
pub mod options;
pub mod signal;
pub mod stats;
pub mod suite;
pub mod timing;
pub mod types;

mod cycle;
mod sampler;

// Re-export key types for convenience
pub use benchmark::{BenchState, Benchmark, BenchmarkBuilder};
pub use compare::{Filter, Speed, filter};
pub use config::HarnessConfig;
pub use deferred::CompletionHandle;
pub use event::{Emitter, Event, EventKind, Flow, SuiteInfo, Target};
pub use invoke::Invoke;
pub use operation::Operation;
pub use options::BenchOptions;
pub use sampler::MAX_QUEUED;
pub use signal::AbortHandle;
pub use stats::{Stats, Times};
pub use suite::Suite;
pub use timing::{Calibrator, Clock, ManualClock, SystemClock};
pub use types::{BenchError, OperationError, RunError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
