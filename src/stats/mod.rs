//! Reduction of raw samples into a [`MetricsSummary`]
//!
//! Percentiles use the clamped nearest-rank rule: for `p` over `n` sorted
//! latencies the value at index `min(floor(n * p), n - 1)` is reported. No
//! interpolation is done, so small runs report the larger of two adjacent
//! ranks (p95 of ten samples is the maximum).

use crate::models::{MetricsSummary, Sample};
use std::time::Duration;

pub const P95: f64 = 0.95;
pub const P99: f64 = 0.99;

/// Summarise one run's samples.
///
/// `elapsed` is the wall-clock time the run actually took. An empty sample
/// set gives an all-zero summary; throughput is zero when `elapsed` is zero.
pub fn reduce(samples: &[Sample], elapsed: Duration) -> MetricsSummary {
    if samples.is_empty() {
        return MetricsSummary::empty(elapsed);
    }

    let total_requests = samples.len() as u64;
    let success_count = samples.iter().filter(|s| s.is_success()).count() as u64;
    let failure_count = total_requests - success_count;

    let mut latencies: Vec<Duration> = samples.iter().map(|s| s.latency).collect();
    latencies.sort_unstable();

    let elapsed_secs = elapsed.as_secs_f64();
    let throughput = if elapsed_secs > 0.0 {
        total_requests as f64 / elapsed_secs
    } else {
        0.0
    };

    MetricsSummary {
        total_requests,
        success_count,
        failure_count,
        average_latency: average(&latencies),
        p95_latency: percentile(&latencies, P95),
        p99_latency: percentile(&latencies, P99),
        throughput,
        error_rate: failure_count as f64 / total_requests as f64 * 100.0,
        elapsed,
    }
}

/// Index of percentile `p` (0.0..=1.0) among `count` sorted values
pub fn nearest_rank_index(count: usize, p: f64) -> usize {
    if count == 0 {
        return 0;
    }
    let index = (count as f64 * p).floor() as usize;
    index.min(count - 1)
}

/// Nearest-rank percentile of an ascending slice; zero when empty
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    sorted[nearest_rank_index(sorted.len(), p)]
}

/// Integer-nanosecond mean, truncated like the sum divided by the count
pub fn average(latencies: &[Duration]) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }
    let sum: u128 = latencies.iter().map(Duration::as_nanos).sum();
    let mean = sum / latencies.len() as u128;
    Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
}
