//! Sample workloads for the hzbench harness.
//!
//! These double as end-to-end demos: [`run_benchmark`] measures one workload
//! by name, [`build_suite`] assembles several into a [`Suite`].

use hzbench_sdk::{
    BenchError as HarnessError, BenchOptions, Benchmark, Calibrator, HarnessConfig, Operation,
    Suite,
};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CHECKSUM_INPUT: [u8; 1024] = [1; 1024];

/// Workload names accepted by [`operation`].
pub const WORKLOADS: [&str; 3] = ["fibonacci", "checksum", "sleeper"];

/// Summary of one measured benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    pub name: String,
    pub hz: f64,
    pub mean: f64,
    pub rme: f64,
    pub samples: usize,
    pub error: Option<String>,
}

impl From<&Benchmark> for BenchReport {
    fn from(bench: &Benchmark) -> Self {
        let stats = bench.stats();
        Self {
            name: bench.name().to_string(),
            hz: bench.hz(),
            mean: stats.mean,
            rme: stats.rme,
            samples: stats.len(),
            error: bench.error().map(ToString::to_string),
        }
    }
}

impl BenchReport {
    /// Renders the report as pretty JSON.
    pub fn to_json(&self) -> Result<String, SampleError> {
        serde_json::to_string_pretty(self).map_err(|e| SampleError::ExecutionFailed {
            reason: e.to_string(),
        })
    }
}

/// Error types for sample runs.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("unknown benchmark function: {name}")]
    UnknownFunction { name: String },

    #[error("benchmark execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error(transparent)]
    Harness(#[from] HarnessError),
}

/// Builds the operation for a workload name.
pub fn operation(name: &str) -> Result<Operation, SampleError> {
    let op = match name {
        "fibonacci" | "fib" | "sample_fns::fibonacci" => Operation::new(|| {
            black_box(fibonacci_batch(30, 100));
        }),
        "checksum" | "checksum_1k" | "sample_fns::checksum" => Operation::new(|| {
            black_box(checksum(black_box(&CHECKSUM_INPUT)));
        }),
        "sleeper" | "sample_fns::sleeper" => sleeper(Duration::from_micros(200)),
        _ => {
            return Err(SampleError::UnknownFunction {
                name: name.to_string(),
            });
        }
    };
    Ok(op)
}

/// A deferred operation that resolves after `delay` on the tokio runtime.
pub fn sleeper(delay: Duration) -> Operation {
    Operation::deferred(move |handle| {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.resolve();
        });
    })
}

/// Measures one workload with `options`.
///
/// Runs on the current tokio runtime so deferred workloads work too.
pub async fn run_benchmark(
    name: &str,
    options: BenchOptions,
    calibrator: Arc<Calibrator>,
) -> Result<BenchReport, SampleError> {
    let bench = Benchmark::with_options(name, operation(name)?, calibrator, options)?;
    measure(bench).await
}

/// Runs `bench` and reports it. A failure captured during the run becomes
/// [`HarnessError::Run`].
async fn measure(mut bench: Benchmark) -> Result<BenchReport, SampleError> {
    bench.run_async().await;
    debug!(name = bench.name(), hz = bench.hz(), "sample benchmark finished");
    if let Some(err) = bench.error() {
        return Err(HarnessError::from(err.clone()).into());
    }
    Ok(BenchReport::from(&bench))
}

/// Assembles a suite of the named workloads using `config`.
pub fn build_suite(
    names: &[&str],
    config: &HarnessConfig,
    calibrator: Arc<Calibrator>,
) -> Result<Suite, SampleError> {
    let mut suite = Suite::from_config("samples", config, calibrator);
    for &name in names {
        suite.add_operation(name, operation(name)?)?;
    }
    Ok(suite)
}

/// Compute fibonacci number iteratively.
pub fn fibonacci(n: u32) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => {
            let mut a = 0u64;
            let mut b = 1u64;
            for _ in 2..=n {
                let next = a.wrapping_add(b);
                a = b;
                b = next;
            }
            b
        }
    }
}

/// Compute fibonacci in a more measurable way by doing it multiple times.
pub fn fibonacci_batch(n: u32, iterations: u32) -> u64 {
    let mut result = 0u64;
    for _ in 0..iterations {
        result = result.wrapping_add(fibonacci(black_box(n)));
    }
    result
}

/// Compute checksum by summing all bytes.
pub fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| b as u64).sum()
}
