//! Fixed-rate load engine
//!
//! This module drives a [`Sampler`] at a constant cadence for a bounded time:
//! - A ticker fires every `1s / target_rate`, first tick one period after start
//! - The run stops at the deadline or when the [`CancellationToken`] fires,
//!   whichever comes first; cancellation is checked before the deadline and
//!   both before a pending tick
//! - Samples stay local to one run and are reduced once when it ends
//!
//! In [`DispatchMode::Serialized`] each tick waits for its request, so a
//! target slower than the tick interval lowers the achieved rate (missed
//! ticks are skipped, not queued). [`DispatchMode::Pooled`] spawns a request
//! per tick up to the worker limit and waits for in-flight requests before
//! reducing.

use crate::{
    client::{HttpSampler, Sampler},
    error::Result,
    logging::RunLogger,
    models::{LoadTestConfig, MetricsSummary, Sample},
    stats,
    types::DispatchMode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
    time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Upper bound on the sample buffer reserved up front
const MAX_PREALLOCATED_SAMPLES: u64 = 1 << 20;

/// Why a drive loop stopped issuing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Deadline => "deadline reached",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Samples gathered by one drive loop
struct DriveOutcome {
    samples: Vec<Sample>,
    skipped_ticks: u64,
}

/// Runs one fixed-rate load test per [`LoadEngine::run`] call.
///
/// The engine holds no per-run state, so one engine can run several tests
/// concurrently; each run collects and reduces its own samples.
pub struct LoadEngine {
    config: LoadTestConfig,
    sampler: Arc<dyn Sampler>,
    run_logger: Option<Arc<RunLogger>>,
}

impl LoadEngine {
    pub fn new(config: LoadTestConfig, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            config,
            sampler,
            run_logger: None,
        }
    }

    /// Engine that sends `GET` requests to the configured endpoint
    pub fn http(config: LoadTestConfig) -> Result<Self> {
        config.validate()?;
        let sampler = HttpSampler::new(&config.endpoint)?;
        Ok(Self::new(config, Arc::new(sampler)))
    }

    pub fn with_logger(mut self, run_logger: Arc<RunLogger>) -> Self {
        self.run_logger = Some(run_logger);
        self
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// Drive the sampler until the deadline or cancellation and summarise.
    ///
    /// Only an invalid configuration is an error, and it is reported before
    /// any request is sent. Failed requests are counted in the summary.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MetricsSummary> {
        self.config.validate()?;

        let correlation_id = match &self.run_logger {
            Some(run_logger) => run_logger.log_run_start(&self.config).await,
            None => String::new(),
        };

        let start = Instant::now();
        let outcome = match self.config.dispatch {
            DispatchMode::Serialized => self.drive_serialized(&cancel, start, &correlation_id).await,
            DispatchMode::Pooled { workers } => {
                self.drive_pooled(&cancel, start, workers, &correlation_id).await
            }
        };
        let elapsed = start.elapsed();

        let summary = stats::reduce(&outcome.samples, elapsed);

        if let Some(run_logger) = &self.run_logger {
            if outcome.skipped_ticks > 0 {
                run_logger
                    .logger()
                    .debug(&format!("{} ticks skipped with all workers busy", outcome.skipped_ticks))
                    .correlation_id(&correlation_id)
                    .field("skipped_ticks", outcome.skipped_ticks)
                    .log()
                    .await;
            }
            run_logger.log_run_complete(&correlation_id, &summary).await;
        }

        Ok(summary)
    }

    fn ticker(&self, start: Instant) -> Interval {
        let period = self.config.tick_interval();
        let mut ticker = interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    fn sample_buffer(&self) -> Vec<Sample> {
        let expected = self.config.expected_requests().min(MAX_PREALLOCATED_SAMPLES);
        Vec::with_capacity(expected as usize)
    }

    async fn drive_serialized(
        &self,
        cancel: &CancellationToken,
        start: Instant,
        correlation_id: &str,
    ) -> DriveOutcome {
        let mut ticker = self.ticker(start);
        let deadline = sleep_until(start + self.config.duration);
        tokio::pin!(deadline);

        let mut samples = self.sample_buffer();

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = &mut deadline => break StopReason::Deadline,
                _ = ticker.tick() => {
                    let sample = self.sampler.sample().await;
                    self.record(&mut samples, sample, correlation_id).await;
                }
            }
        };

        if let Some(run_logger) = &self.run_logger {
            run_logger.log_stop(correlation_id, reason.as_str(), 0).await;
        }

        DriveOutcome {
            samples,
            skipped_ticks: 0,
        }
    }

    async fn drive_pooled(
        &self,
        cancel: &CancellationToken,
        start: Instant,
        workers: usize,
        correlation_id: &str,
    ) -> DriveOutcome {
        let mut ticker = self.ticker(start);
        let deadline = sleep_until(start + self.config.duration);
        tokio::pin!(deadline);

        let permits = Arc::new(Semaphore::new(workers));
        let mut in_flight: JoinSet<Sample> = JoinSet::new();
        let mut samples = self.sample_buffer();
        let mut skipped_ticks = 0u64;

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = &mut deadline => break StopReason::Deadline,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    let sample = self.joined_sample(joined, correlation_id).await;
                    self.record(&mut samples, sample, correlation_id).await;
                }
                _ = ticker.tick() => {
                    let Ok(permit) = permits.clone().try_acquire_owned() else {
                        skipped_ticks += 1;
                        continue;
                    };
                    let sampler = Arc::clone(&self.sampler);
                    in_flight.spawn(async move {
                        let sample = sampler.sample().await;
                        drop(permit);
                        sample
                    });
                }
            }
        };

        if let Some(run_logger) = &self.run_logger {
            run_logger.log_stop(correlation_id, reason.as_str(), in_flight.len()).await;
        }

        while let Some(joined) = in_flight.join_next().await {
            let sample = self.joined_sample(joined, correlation_id).await;
            self.record(&mut samples, sample, correlation_id).await;
        }

        DriveOutcome {
            samples,
            skipped_ticks,
        }
    }

    /// A request task that panicked or was aborted counts as a failed request
    async fn joined_sample(&self, joined: std::result::Result<Sample, JoinError>, correlation_id: &str) -> Sample {
        match joined {
            Ok(sample) => sample,
            Err(e) => {
                if let Some(run_logger) = &self.run_logger {
                    run_logger.log_task_failure(correlation_id, &e.to_string()).await;
                }
                Sample::failure(Duration::ZERO)
            }
        }
    }

    async fn record(&self, samples: &mut Vec<Sample>, sample: Sample, correlation_id: &str) {
        samples.push(sample);
        if let Some(run_logger) = &self.run_logger {
            run_logger.log_sample(correlation_id, samples.len() as u64, &sample).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::types::Outcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sampler that counts calls and answers after a fixed delay
    struct StubSampler {
        calls: AtomicUsize,
        delay: Duration,
        outcome: Outcome,
    }

    impl StubSampler {
        fn new(delay: Duration, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                outcome,
            })
        }

        fn instant() -> Arc<Self> {
            Self::new(Duration::ZERO, Outcome::Success)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Sampler for StubSampler {
        async fn sample(&self) -> Sample {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Sample::new(self.delay, self.outcome)
        }
    }

    /// Sampler whose request task always panics
    struct PanickingSampler;

    #[async_trait]
    impl Sampler for PanickingSampler {
        async fn sample(&self) -> Sample {
            panic!("sampler exploded");
        }
    }

    fn cancel_after(cancel: &CancellationToken, delay: Duration) {
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.cancel();
        });
    }

    fn config(duration_ms: u64, rate: u32) -> LoadTestConfig {
        LoadTestConfig::new(Duration::from_millis(duration_ms), rate, "http://localhost")
    }

    #[tokio::test]
    async fn test_invalid_config_sends_nothing() {
        let cases = vec![
            LoadTestConfig::new(Duration::from_secs(1), 10, ""),
            LoadTestConfig::new(Duration::from_secs(1), 0, "http://localhost"),
            LoadTestConfig::new(Duration::ZERO, 10, "http://localhost"),
            LoadTestConfig::new(Duration::from_millis(50), 2_000_000_000, "http://localhost"),
            config(1_000, 10).with_dispatch(DispatchMode::Pooled { workers: 0 }),
        ];

        for case in cases {
            let sampler = StubSampler::instant();
            let engine = LoadEngine::new(case, sampler.clone());
            let result = engine.run(CancellationToken::new()).await;
            assert!(matches!(result, Err(AppError::Config(_))));
            assert_eq!(sampler.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_http_engine_rejects_empty_endpoint() {
        let result = LoadEngine::http(LoadTestConfig::new(Duration::from_secs(1), 10, ""));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_rate_is_followed() {
        let sampler = StubSampler::instant();
        let engine = LoadEngine::new(config(1_000, 10), sampler.clone());

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        assert!((9..=10).contains(&summary.total_requests), "got {}", summary.total_requests);
        assert_eq!(summary.total_requests, sampler.calls() as u64);
        assert_eq!(summary.success_count, summary.total_requests);
        assert!(summary.elapsed >= Duration::from_millis(1_000));
        assert!(summary.elapsed < Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn test_first_tick_waits_one_period() {
        // 4 ticks per second over 200ms: the first tick lands at 250ms
        let sampler = StubSampler::instant();
        let engine = LoadEngine::new(config(200, 4), sampler.clone());

        let summary = engine.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(sampler.calls(), 0);
        assert_eq!(summary.throughput, 0.0);
    }

    #[tokio::test]
    async fn test_slow_target_lowers_serialized_rate() {
        let sampler = StubSampler::new(Duration::from_millis(250), Outcome::Success);
        let engine = LoadEngine::new(config(1_000, 10), sampler.clone());

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        assert!(summary.total_requests >= 2 && summary.total_requests <= 4, "got {}", summary.total_requests);
        assert_eq!(summary.average_latency, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_is_empty() {
        let sampler = StubSampler::instant();
        let engine = LoadEngine::new(config(5_000, 50), sampler.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = engine.run(cancel).await.unwrap();

        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.error_rate, 0.0);
        assert_eq!(sampler.calls(), 0);
        assert!(summary.elapsed < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_cancellation_stops_early() {
        let sampler = StubSampler::instant();
        let engine = LoadEngine::new(config(10_000, 10), sampler.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(450)).await;
            trigger.cancel();
        });

        let summary = engine.run(cancel).await.unwrap();

        assert!(summary.elapsed < Duration::from_secs(2));
        assert!((3..=5).contains(&summary.total_requests), "got {}", summary.total_requests);
        assert_eq!(summary.total_requests, sampler.calls() as u64);
    }

    #[tokio::test]
    async fn test_cancel_lets_in_flight_request_finish() {
        // First tick at 100ms starts a 400ms request; cancel lands mid-request
        let sampler = StubSampler::new(Duration::from_millis(400), Outcome::Success);
        let engine = LoadEngine::new(config(10_000, 10), sampler.clone());
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(200));

        let summary = engine.run(cancel).await.unwrap();

        assert_eq!(summary.total_requests, 1);
        assert_eq!(summary.success_count, 1);
        assert_eq!(sampler.calls(), 1);
        assert!(summary.elapsed >= Duration::from_millis(500));
        assert!(summary.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pooled_cancel_drains_in_flight_requests() {
        // Ticks at 100ms and 200ms both start before the 250ms cancel
        let sampler = StubSampler::new(Duration::from_millis(400), Outcome::Success);
        let engine = LoadEngine::new(
            config(10_000, 10).with_dispatch(DispatchMode::Pooled { workers: 8 }),
            sampler.clone(),
        );
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(250));

        let summary = engine.run(cancel).await.unwrap();

        assert!(summary.total_requests >= 1, "got {}", summary.total_requests);
        assert_eq!(summary.total_requests, sampler.calls() as u64);
        assert_eq!(summary.success_count, summary.total_requests);
        assert_eq!(summary.average_latency, Duration::from_millis(400));
        assert!(summary.elapsed >= Duration::from_millis(500));
        assert!(summary.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pooled_panicking_task_counts_as_failure() {
        let engine = LoadEngine::new(
            config(500, 10).with_dispatch(DispatchMode::Pooled { workers: 4 }),
            Arc::new(PanickingSampler),
        );

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        assert!(summary.total_requests > 0);
        assert_eq!(summary.failure_count, summary.total_requests);
        assert_eq!(summary.error_rate, 100.0);
    }

    #[tokio::test]
    async fn test_failures_do_not_fail_the_run() {
        let sampler = StubSampler::new(Duration::ZERO, Outcome::Failure);
        let engine = LoadEngine::new(config(500, 20), sampler.clone());

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        assert!(summary.total_requests > 0);
        assert_eq!(summary.failure_count, summary.total_requests);
        assert_eq!(summary.error_rate, 100.0);
    }

    #[tokio::test]
    async fn test_pooled_keeps_cadence_with_slow_target() {
        let sampler = StubSampler::new(Duration::from_millis(250), Outcome::Success);
        let engine = LoadEngine::new(
            config(1_000, 10).with_dispatch(DispatchMode::Pooled { workers: 8 }),
            sampler.clone(),
        );

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        // Every dispatched request is awaited before reducing
        assert_eq!(summary.total_requests, sampler.calls() as u64);
        assert!((8..=10).contains(&summary.total_requests), "got {}", summary.total_requests);
        assert!(summary.elapsed >= Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_pooled_skips_ticks_when_saturated() {
        let sampler = StubSampler::new(Duration::from_millis(300), Outcome::Success);
        let engine = LoadEngine::new(
            config(1_000, 20).with_dispatch(DispatchMode::Pooled { workers: 1 }),
            sampler.clone(),
        );

        let summary = engine.run(CancellationToken::new()).await.unwrap();

        assert!(summary.total_requests <= 4, "got {}", summary.total_requests);
        assert_eq!(summary.total_requests, sampler.calls() as u64);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let sampler = StubSampler::instant();
        let engine = Arc::new(LoadEngine::new(config(500, 20), sampler.clone()));

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run(CancellationToken::new()).await }
        });
        let second = tokio::spawn({
            let engine = engine.clone();
            async move { engine.run(CancellationToken::new()).await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert!((9..=10).contains(&first.total_requests));
        assert!((9..=10).contains(&second.total_requests));
        assert_eq!(first.total_requests + second.total_requests, sampler.calls() as u64);
    }
}
