//! Significance testing between benchmarks.
//!
//! Two benchmarks are compared with the Mann-Whitney U test over their period
//! samples. The test is nonparametric, so it holds up for the skewed,
//! long-tailed distributions timing samples usually have.

use crate::benchmark::Benchmark;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Combined sample size above which the normal approximation is used.
const NORMAL_APPROXIMATION_SIZE: usize = 30;

/// Two-tailed 95% z threshold.
const Z_CRITICAL: f64 = 1.96;

/// Critical U values for 95% confidence, keyed by the larger sample size
/// (5 through 30). Each row is indexed by the smaller size minus 3.
const U_TABLE: [&[u32]; 26] = [
    &[0, 1, 2],
    &[1, 2, 3, 5],
    &[1, 3, 5, 6, 8],
    &[2, 4, 6, 8, 10, 13],
    &[2, 4, 7, 10, 12, 15, 17],
    &[3, 5, 8, 11, 14, 17, 20, 23],
    &[3, 6, 9, 13, 16, 19, 23, 26, 30],
    &[4, 7, 11, 14, 18, 22, 26, 29, 33, 37],
    &[4, 8, 12, 16, 20, 24, 28, 33, 37, 41, 45],
    &[5, 9, 13, 17, 22, 26, 31, 36, 40, 45, 50, 55],
    &[5, 10, 14, 19, 24, 29, 34, 39, 44, 49, 54, 59, 64],
    &[6, 11, 15, 21, 26, 31, 37, 42, 47, 53, 59, 64, 70, 75],
    &[6, 11, 17, 22, 28, 34, 39, 45, 51, 57, 63, 67, 75, 81, 87],
    &[7, 12, 18, 24, 30, 36, 42, 48, 55, 61, 67, 74, 80, 86, 93, 99],
    &[7, 13, 19, 25, 32, 38, 45, 52, 58, 65, 72, 78, 85, 92, 99, 106, 113],
    &[8, 14, 20, 27, 34, 41, 48, 55, 62, 69, 76, 83, 90, 98, 105, 112, 119, 127],
    &[8, 15, 22, 29, 36, 43, 50, 58, 65, 73, 80, 88, 96, 103, 111, 119, 126, 134, 142],
    &[9, 16, 23, 30, 38, 45, 53, 61, 69, 77, 85, 93, 101, 109, 117, 125, 133, 141, 150, 158],
    &[9, 17, 24, 32, 40, 48, 56, 64, 73, 81, 89, 98, 106, 115, 123, 132, 140, 149, 157, 166, 175],
    &[
        10, 17, 25, 33, 42, 50, 59, 67, 76, 85, 94, 102, 111, 120, 129, 138, 147, 156, 165, 174,
        183, 192,
    ],
    &[
        10, 18, 27, 35, 44, 53, 62, 71, 80, 89, 98, 107, 117, 126, 135, 145, 154, 163, 173, 182,
        192, 201, 211,
    ],
    &[
        11, 19, 28, 37, 46, 55, 64, 74, 83, 93, 102, 112, 122, 132, 141, 151, 161, 171, 181, 191,
        200, 210, 220, 230,
    ],
    &[
        11, 20, 29, 38, 48, 57, 67, 77, 87, 97, 107, 118, 125, 138, 147, 158, 168, 178, 188, 199,
        209, 219, 230, 240, 250,
    ],
    &[
        12, 21, 30, 40, 50, 60, 70, 80, 90, 101, 111, 122, 132, 143, 154, 164, 175, 186, 196, 207,
        218, 228, 239, 250, 261, 272,
    ],
    &[
        13, 22, 32, 42, 52, 62, 73, 83, 94, 105, 116, 127, 138, 149, 160, 171, 182, 193, 204, 215,
        226, 238, 249, 260, 271, 282, 294,
    ],
    &[
        13, 23, 33, 43, 54, 65, 76, 87, 98, 109, 120, 131, 143, 154, 166, 177, 189, 200, 212, 223,
        235, 247, 258, 270, 282, 293, 305, 317,
    ],
];

/// Verdict of a comparison, from the first benchmark's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speed {
    /// Significantly slower.
    Slower = -1,
    /// No significant difference.
    Same = 0,
    /// Significantly faster.
    Faster = 1,
}

impl Speed {
    /// The verdict as `-1`, `0` or `1`.
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// The verdict from the other benchmark's point of view.
    pub fn reverse(self) -> Self {
        match self {
            Speed::Slower => Speed::Faster,
            Speed::Same => Speed::Same,
            Speed::Faster => Speed::Slower,
        }
    }
}

impl From<Speed> for i8 {
    fn from(speed: Speed) -> Self {
        speed.as_i8()
    }
}

/// Details of one Mann-Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UTest {
    /// U statistic of the first sample.
    pub u1: f64,
    /// U statistic of the second sample.
    pub u2: f64,
    /// The smaller of the two.
    pub u: f64,
    /// z statistic, when the normal approximation applies.
    pub z: Option<f64>,
    /// Critical U value, when the table applies and covers the sample sizes.
    pub critical: Option<f64>,
}

impl UTest {
    /// Runs the test over two period samples.
    ///
    /// ```
    /// use hzbench_sdk::compare::UTest;
    ///
    /// let fast = [1.0, 1.1, 0.9, 1.05, 0.95];
    /// let slow = [10.0, 11.0, 9.0, 10.5, 9.5];
    /// let test = UTest::run(&fast, &slow);
    /// assert_eq!(test.u1, 0.0);
    /// assert_eq!(test.critical, Some(2.0));
    /// assert!(test.is_significant());
    /// ```
    pub fn run(sample1: &[f64], sample2: &[f64]) -> Self {
        let (size1, size2) = (sample1.len(), sample2.len());
        let u1 = u_statistic(sample1, sample2);
        let u2 = u_statistic(sample2, sample1);
        let u = u1.min(u2);

        if size1 + size2 > NORMAL_APPROXIMATION_SIZE {
            let (n1, n2) = (size1 as f64, size2 as f64);
            let z = (u - n1 * n2 / 2.0) / (n1 * n2 * (n1 + n2 + 1.0) / 12.0).sqrt();
            return Self {
                u1,
                u2,
                u,
                z: Some(z),
                critical: None,
            };
        }
        Self {
            u1,
            u2,
            u,
            z: None,
            critical: critical_u(size1.max(size2), size1.min(size2)),
        }
    }

    /// Whether the null hypothesis of equal medians is rejected.
    pub fn is_significant(&self) -> bool {
        match (self.z, self.critical) {
            (Some(z), _) => z.abs() > Z_CRITICAL,
            (None, Some(critical)) => self.u <= critical,
            (None, None) => false,
        }
    }

    /// The verdict for the first sample.
    pub fn speed(&self) -> Speed {
        if !self.is_significant() {
            Speed::Same
        } else if self.u == self.u1 {
            Speed::Faster
        } else {
            Speed::Slower
        }
    }
}

/// Counts, for each element of `a`, the elements of `b` it exceeds (ties
/// count half).
fn u_statistic(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .map(|&xa| {
            b.iter()
                .map(|&xb| match xb.partial_cmp(&xa) {
                    Some(Ordering::Less) => 1.0,
                    Some(Ordering::Equal) => 0.5,
                    _ => 0.0,
                })
                .sum::<f64>()
        })
        .sum()
}

fn critical_u(max_size: usize, min_size: usize) -> Option<f64> {
    if max_size < 5 || min_size < 3 {
        return None;
    }
    U_TABLE
        .get(max_size - 5)
        .and_then(|row| row.get(min_size - 3))
        .map(|&critical| f64::from(critical))
}

/// Compares two period samples. Smaller periods are faster.
pub fn compare_samples(sample1: &[f64], sample2: &[f64]) -> Speed {
    UTest::run(sample1, sample2).speed()
}

/// Selection criteria for [`filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Benchmarks that ran at least one cycle, have a finite rate, and did not
    /// fail.
    Successful,
    /// The successful benchmarks indistinguishable from the fastest.
    Fastest,
    /// The successful benchmarks indistinguishable from the slowest.
    Slowest,
}

/// Selects benchmarks by `criteria`.
///
/// `Fastest` and `Slowest` rank the successful benchmarks by `mean + moe` and
/// keep every benchmark that compares [`Speed::Same`] against the first of
/// that ranking, the first one included.
pub fn filter<'a, I>(benches: I, criteria: Filter) -> Vec<&'a Benchmark>
where
    I: IntoIterator<Item = &'a Benchmark>,
{
    let successful: Vec<&Benchmark> = benches
        .into_iter()
        .filter(|bench| {
            let state = bench.state();
            state.cycles > 0 && state.hz.is_finite() && state.error.is_none()
        })
        .collect();

    let mut ranked = match criteria {
        Filter::Successful => return successful,
        Filter::Fastest | Filter::Slowest => successful,
    };
    ranked.sort_by(|a, b| {
        let (a, b) = (a.stats(), b.stats());
        let order = (a.mean + a.moe).total_cmp(&(b.mean + b.moe));
        if criteria == Filter::Slowest {
            order.reverse()
        } else {
            order
        }
    });

    let Some(&first) = ranked.first() else {
        return ranked;
    };
    ranked
        .into_iter()
        .filter(|bench| first.compare(bench) == Speed::Same)
        .collect()
}
