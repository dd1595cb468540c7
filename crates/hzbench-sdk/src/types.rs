//! Core error types for hzbench-sdk.
//!
//! The harness separates two kinds of failure:
//!
//! - [`BenchError`] - misuse or fatal setup problems returned from the API
//!   (no usable clock, invalid options, configuration files that fail to load).
//! - [`RunError`] - failures of a measured run. These are never returned; they are
//!   captured into [`BenchState::error`](crate::BenchState::error) and surfaced
//!   through `error` events so observers see them in order with other lifecycle
//!   transitions.

use serde::{Deserialize, Serialize};

/// Error type returned by measured operations.
///
/// Any error that converts into a boxed [`std::error::Error`] can be returned
/// from a fallible operation closure.
pub type OperationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for hzbench-sdk operations.
///
/// # Example
///
/// ```
/// use hzbench_sdk::{BenchError, Calibrator, ManualClock};
/// use std::sync::Arc;
///
/// // A clock that never advances cannot be calibrated.
/// let frozen = Arc::new(ManualClock::new());
/// let result = Calibrator::with_resolution(frozen, f64::INFINITY);
/// assert!(matches!(result, Err(BenchError::NoUsableClock { .. })));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The clock never advanced or reported a non-finite resolution.
    ///
    /// Nothing can be measured without a working clock.
    #[error("no usable clock: measured resolution is {resolution} seconds")]
    NoUsableClock {
        /// The resolution that was measured or supplied.
        resolution: f64,
    },

    /// Benchmark options failed validation.
    #[error("invalid benchmark options: {0}")]
    InvalidOptions(String),

    /// A deferred benchmark was started through the synchronous API.
    ///
    /// Deferred operations signal completion through a
    /// [`CompletionHandle`](crate::CompletionHandle), which can only be awaited
    /// from [`Benchmark::run_async`](crate::Benchmark::run_async).
    #[error("benchmark '{name}' is deferred and must be run with run_async")]
    DeferredRequiresAsync {
        /// Name of the offending benchmark.
        name: String,
    },

    /// A configuration error occurred.
    #[error("configuration error: {0}. Check hzbench.toml")]
    Config(String),

    /// An I/O error occurred while reading or writing configuration.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A measured run failed.
    #[error("benchmark run failed: {0}")]
    Run(#[from] RunError),
}

/// Failure captured from a measured run.
///
/// Stored on the benchmark and carried by `error` events. Cloneable so that
/// snapshots handed to listeners can include it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RunError {
    /// The operation returned an error.
    #[error("operation failed: {0}")]
    Operation(String),

    /// The operation panicked inside a timed region.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// A deferred operation dropped its completion handle without resolving it.
    #[error("completion handle dropped without being resolved")]
    Unresolved,

    /// No finite iteration count could be established for the operation.
    ///
    /// Raised when the operation keeps clocking at zero or the count needed
    /// to reach the minimum run duration is unbounded.
    #[error("operation cannot be measured: iteration count grew past {count}")]
    Unmeasurable {
        /// The last finite count that was timed.
        count: u64,
    },
}

impl RunError {
    /// Builds a [`RunError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        RunError::Panicked(message)
    }
}
