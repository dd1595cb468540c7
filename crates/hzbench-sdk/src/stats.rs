//! Sample statistics.
//!
//! [`Stats`] is recomputed from the full sample after every sampling round.
//! The margin of error is the half-width of a two-tailed 95% confidence
//! interval from Student's t-distribution.

use serde::{Deserialize, Serialize};

/// Two-tailed 95% critical values of Student's t-distribution for 1 to 30
/// degrees of freedom.
const T_TABLE: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.16,
    2.145, 2.131, 2.12, 2.11, 2.101, 2.093, 2.086, 2.08, 2.074, 2.069, 2.064, 2.06, 2.056, 2.052,
    2.048, 2.045, 2.042,
];

/// Normal approximation used past the end of [`T_TABLE`].
const T_INFINITY: f64 = 1.96;

/// Critical value for `df` degrees of freedom.
///
/// `df` is rounded; zero degrees of freedom use the single-degree value.
pub fn critical_value(df: f64) -> f64 {
    let df = df.round();
    if df > T_TABLE.len() as f64 {
        return T_INFINITY;
    }
    let index = (df as usize).max(1);
    T_TABLE[index - 1]
}

/// Summary statistics of a period sample.
///
/// All values are in seconds per operation except `rme`, a percentage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Period of each completed sampling round, in order.
    pub sample: Vec<f64>,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample variance (0 for fewer than two samples).
    pub variance: f64,
    /// Standard deviation.
    pub deviation: f64,
    /// Standard error of the mean.
    pub sem: f64,
    /// Margin of error.
    pub moe: f64,
    /// Relative margin of error, as a percentage of the mean.
    pub rme: f64,
}

impl Stats {
    /// Computes statistics over `sample`.
    ///
    /// ```
    /// use hzbench_sdk::Stats;
    ///
    /// let stats = Stats::from_sample(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    /// assert_eq!(stats.mean, 5.0);
    /// assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
    /// assert!(stats.rme > 0.0);
    /// ```
    pub fn from_sample(sample: Vec<f64>) -> Self {
        let mut stats = Self {
            sample,
            ..Self::default()
        };
        stats.recompute();
        stats
    }

    /// Recomputes every summary value from `self.sample`.
    ///
    /// An empty sample yields all zeros.
    pub fn recompute(&mut self) {
        let size = self.sample.len();
        if size == 0 {
            *self = Self::default();
            return;
        }
        let n = size as f64;
        let mean = self.sample.iter().sum::<f64>() / n;
        let variance = if size > 1 {
            self.sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let deviation = variance.sqrt();
        let sem = deviation / n.sqrt();
        let moe = sem * critical_value(n - 1.0);
        let rme = moe / mean * 100.0;

        self.mean = mean;
        self.variance = variance;
        self.deviation = deviation;
        self.sem = sem;
        self.moe = moe;
        self.rme = if rme.is_nan() { 0.0 } else { rme };
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.sample.len()
    }

    /// Whether no samples have been collected.
    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }
}

/// Timing summary of a benchmark, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Times {
    /// Time taken by one cycle of `count` operations.
    pub cycle: f64,
    /// Time taken by one operation.
    pub period: f64,
    /// Wall-clock time the whole run took.
    pub elapsed: f64,
    /// Clock reading when the run started.
    pub timestamp: f64,
}
