//! Sample and summary data models

use crate::types::Outcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One measured request.
///
/// Created by a sampler once the response (or the error) is observed and
/// never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Time from dispatch to response headers or transport error
    #[serde(with = "duration_ms")]
    pub latency: Duration,

    /// Success iff a 2xx response arrived within the request timeout
    pub outcome: Outcome,
}

impl Sample {
    pub fn new(latency: Duration, outcome: Outcome) -> Self {
        Self { latency, outcome }
    }

    pub fn success(latency: Duration) -> Self {
        Self::new(latency, Outcome::Success)
    }

    pub fn failure(latency: Duration) -> Self {
        Self::new(latency, Outcome::Failure)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

/// Result of one load run.
///
/// `total_requests == success_count + failure_count` always holds. With zero
/// requests every rate and latency is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,

    #[serde(with = "duration_ms")]
    pub average_latency: Duration,

    #[serde(with = "duration_ms")]
    pub p95_latency: Duration,

    #[serde(with = "duration_ms")]
    pub p99_latency: Duration,

    /// Requests per second over the actual elapsed time
    pub throughput: f64,

    /// Failed requests as a percentage of all requests
    pub error_rate: f64,

    /// Actual run time; shorter than configured when cancelled early
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl MetricsSummary {
    /// Summary of a run that collected nothing
    pub fn empty(elapsed: Duration) -> Self {
        Self {
            total_requests: 0,
            success_count: 0,
            failure_count: 0,
            average_latency: Duration::ZERO,
            p95_latency: Duration::ZERO,
            p99_latency: Duration::ZERO,
            throughput: 0.0,
            error_rate: 0.0,
            elapsed,
        }
    }

    /// Percentage of successful requests
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            100.0 - self.error_rate
        }
    }

    pub fn average_ms(&self) -> f64 {
        self.average_latency.as_secs_f64() * 1000.0
    }

    pub fn p95_ms(&self) -> f64 {
        self.p95_latency.as_secs_f64() * 1000.0
    }

    pub fn p99_ms(&self) -> f64 {
        self.p99_latency.as_secs_f64() * 1000.0
    }
}

/// Serialize durations as fractional milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid duration in ms: {}", ms)));
        }
        Ok(Duration::from_secs_f64(ms / 1000.0))
    }
}
