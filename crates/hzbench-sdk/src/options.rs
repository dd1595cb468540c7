//! Benchmark options.
//!
//! [`BenchOptions`] controls how long a benchmark runs and how its cycles are
//! scheduled. Options are plain data and can be loaded from `hzbench.toml`
//! (see [`crate::config`]).
//!
//! All durations are expressed in seconds as `f64`, matching the units of the
//! statistics the harness produces.

use crate::types::BenchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single benchmark.
///
/// # Example
///
/// ```
/// use hzbench_sdk::BenchOptions;
///
/// let options = BenchOptions {
///     min_samples: 10,
///     max_time: 1.0,
///     ..BenchOptions::default()
/// };
/// assert!(options.validate().is_ok());
///
/// let broken = BenchOptions { init_count: 0, ..BenchOptions::default() };
/// assert!(broken.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchOptions {
    /// Minimum duration of one timed region (seconds).
    ///
    /// Zero means "derive from the calibrated clock" (see
    /// [`Calibrator::minimum_run_duration`](crate::Calibrator::minimum_run_duration)).
    pub min_time: f64,

    /// Sampling stops once this much time (seconds) has been spent sampling
    /// and at least `min_samples` samples exist. Checked between cycles only.
    pub max_time: f64,

    /// Iteration count of the first timed region.
    pub init_count: u64,

    /// Minimum number of samples before sampling may stop.
    pub min_samples: usize,

    /// The operation signals completion through a
    /// [`CompletionHandle`](crate::CompletionHandle) instead of returning.
    pub deferred: bool,

    /// Cycles and suite transitions yield to the async runtime, pausing for
    /// `delay` in between.
    pub asynchronous: bool,

    /// Pause between cycles and between benchmarks (seconds) when running
    /// asynchronously.
    pub delay: f64,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            min_time: 0.0,
            max_time: 5.0,
            init_count: 1,
            min_samples: 5,
            deferred: false,
            asynchronous: false,
            delay: 0.005,
        }
    }
}

impl BenchOptions {
    /// Checks that every option is usable.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidOptions`] describing the first bad field.
    pub fn validate(&self) -> Result<(), BenchError> {
        for (field, value) in [
            ("min_time", self.min_time),
            ("max_time", self.max_time),
            ("delay", self.delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BenchError::InvalidOptions(format!(
                    "{field} must be a finite, non-negative number of seconds (got {value})"
                )));
            }
        }
        if self.init_count == 0 {
            return Err(BenchError::InvalidOptions(
                "init_count must be greater than zero".into(),
            ));
        }
        if self.min_samples == 0 {
            return Err(BenchError::InvalidOptions(
                "min_samples must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Whether runs of this benchmark go through the async scheduler.
    pub fn is_async(&self) -> bool {
        self.asynchronous || self.deferred
    }

    /// The inter-cycle pause as a [`Duration`].
    pub fn delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = BenchOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.init_count, 1);
        assert_eq!(options.min_samples, 5);
        assert_eq!(options.max_time, 5.0);
        assert_eq!(options.delay_duration(), Duration::from_millis(5));
    }

    #[test]
    fn rejects_negative_and_nan_times() {
        let negative = BenchOptions {
            max_time: -1.0,
            ..BenchOptions::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(BenchError::InvalidOptions(msg)) if msg.contains("max_time")
        ));

        let nan = BenchOptions {
            delay: f64::NAN,
            ..BenchOptions::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn rejects_zero_counts() {
        let options = BenchOptions {
            min_samples: 0,
            ..BenchOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn deferred_implies_async() {
        let options = BenchOptions {
            deferred: true,
            ..BenchOptions::default()
        };
        assert!(options.is_async());
        assert!(!BenchOptions::default().is_async());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options: BenchOptions = toml::from_str("min_samples = 12").unwrap();
        assert_eq!(options.min_samples, 12);
        assert_eq!(options.init_count, 1);
    }
}
