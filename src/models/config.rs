//! Configuration data models and validation

use crate::types::{AppError, DispatchMode, Result};
use crate::utils::{duration_to_millis, parse_duration, parse_workers};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Highest rate whose tick interval is still at least one nanosecond
pub const MAX_RATE: u32 = 1_000_000_000;

/// Input of a single load run.
///
/// Built unchecked by [`LoadTestConfig::new`]; [`LoadTestConfig::validate`]
/// is applied again by the engine before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTestConfig {
    /// Stop issuing new requests once this much time has passed
    pub duration: Duration,

    /// Requests per second; ticks are spaced `1s / target_rate` apart
    pub target_rate: u32,

    /// URL every request is sent to
    pub endpoint: String,

    /// How ticks are turned into requests
    #[serde(default)]
    pub dispatch: DispatchMode,
}

impl LoadTestConfig {
    pub fn new<S: Into<String>>(duration: Duration, target_rate: u32, endpoint: S) -> Self {
        Self {
            duration,
            target_rate,
            endpoint: endpoint.into(),
            dispatch: DispatchMode::Serialized,
        }
    }

    /// Build and validate in one step
    pub fn try_new<S: Into<String>>(duration: Duration, target_rate: u32, endpoint: S) -> Result<Self> {
        let config = Self::new(duration, target_rate, endpoint);
        config.validate()?;
        Ok(config)
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Reject an empty endpoint, a zero or sub-nanosecond-period rate, a zero
    /// duration or an empty worker pool
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AppError::config("endpoint cannot be empty"));
        }
        if self.target_rate == 0 {
            return Err(AppError::config("RPS must be greater than 0"));
        }
        if self.target_rate > MAX_RATE {
            return Err(AppError::config(format!("RPS must be at most {}", MAX_RATE)));
        }
        if self.duration.is_zero() {
            return Err(AppError::config("duration must be greater than 0"));
        }
        if Instant::now().checked_add(self.duration).is_none() {
            return Err(AppError::config("duration is too large"));
        }
        if let DispatchMode::Pooled { workers: 0 } = self.dispatch {
            return Err(AppError::config("worker pool must have at least one worker"));
        }
        Ok(())
    }

    /// Spacing between cadence ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_rate.max(1)
    }

    /// Number of requests a run at full rate would issue
    pub fn expected_requests(&self) -> u64 {
        (self.duration.as_secs_f64() * f64::from(self.target_rate)).floor() as u64
    }
}

/// Application configuration assembled from defaults, `.env`, environment and CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target URL; required before a run can start
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Test duration in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// Target requests per second
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Concurrent workers; 0 keeps the serialized one-request-per-tick loop
    #[serde(default)]
    pub workers: usize,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print the summary as JSON instead of the text report
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            duration_ms: default_duration_ms(),
            rate: default_rate(),
            workers: 0,
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get duration as Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.workers == 0 {
            DispatchMode::Serialized
        } else {
            DispatchMode::Pooled { workers: self.workers }
        }
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => return Err(AppError::config("endpoint is required (use --endpoint flag)")),
        };

        match url::Url::parse(endpoint) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!(
                        "Endpoint must use http or https: {}",
                        endpoint
                    )));
                }
                if parsed.host_str().is_none() {
                    return Err(AppError::config(format!("Endpoint has no host: {}", endpoint)));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid endpoint '{}': {}", endpoint, e)));
            }
        }

        if self.rate == 0 {
            return Err(AppError::config("RPS must be greater than 0"));
        }
        if self.rate > MAX_RATE {
            return Err(AppError::config(format!("RPS must be at most {}", MAX_RATE)));
        }

        if self.duration_ms == 0 {
            return Err(AppError::config("duration must be greater than 0"));
        }

        Ok(())
    }

    /// Build the engine input from this configuration
    pub fn to_load_test_config(&self) -> Result<LoadTestConfig> {
        self.validate()?;
        let endpoint = self.endpoint.clone().unwrap_or_default();
        LoadTestConfig::try_new(self.duration(), self.rate, endpoint)
            .map(|config| config.with_dispatch(self.dispatch_mode()))
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("KTEST_ENDPOINT") {
            let endpoint = endpoint.trim().to_string();
            if !endpoint.is_empty() {
                self.endpoint = Some(endpoint);
            }
        }

        if let Ok(duration) = std::env::var("KTEST_DURATION") {
            self.duration_ms = parse_duration(&duration)
                .and_then(duration_to_millis)
                .map_err(|e| AppError::config(format!("Invalid KTEST_DURATION value '{}': {}", duration, e)))?;
        }

        if let Ok(rate) = std::env::var("KTEST_RPS") {
            self.rate = rate.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid KTEST_RPS value '{}': {}", rate, e)))?;
        }

        if let Ok(workers) = std::env::var("KTEST_WORKERS") {
            self.workers = parse_workers(&workers)
                .map_err(|e| AppError::config(format!("Invalid KTEST_WORKERS value '{}': {}", workers, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_duration_ms() -> u64 {
    crate::defaults::DEFAULT_DURATION.as_millis() as u64
}

fn default_rate() -> u32 {
    crate::defaults::DEFAULT_RATE
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            endpoint: Some("http://example.com".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.duration(), Duration::from_secs(300));
        assert_eq!(config.rate, 100);
        assert!(config.endpoint.is_none());
        assert_eq!(config.dispatch_mode(), DispatchMode::Serialized);
    }

    #[test]
    fn test_missing_endpoint_invalid() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("endpoint is required"));
    }

    #[test]
    fn test_blank_endpoint_invalid() {
        let mut config = valid_config();
        config.endpoint = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_endpoint_invalid() {
        let mut config = valid_config();
        config.endpoint = Some("ftp://example.com".to_string());
        assert!(config.validate().is_err());

        config.endpoint = Some("not-a-url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rate_and_duration_invalid() {
        let mut config = valid_config();
        config.rate = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.duration_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_load_test_config() {
        let mut config = valid_config();
        config.duration_ms = 1_500;
        config.rate = 20;
        config.workers = 4;

        let load = config.to_load_test_config().unwrap();
        assert_eq!(load.duration, Duration::from_millis(1_500));
        assert_eq!(load.target_rate, 20);
        assert_eq!(load.endpoint, "http://example.com");
        assert_eq!(load.dispatch, DispatchMode::Pooled { workers: 4 });
    }

    #[test]
    fn test_load_test_config_validation() {
        let ok = LoadTestConfig::new(Duration::from_secs(1), 10, "http://localhost");
        assert!(ok.validate().is_ok());

        let empty = LoadTestConfig::new(Duration::from_secs(1), 10, "");
        assert!(matches!(empty.validate(), Err(AppError::Config(_))));

        let zero_rate = LoadTestConfig::new(Duration::from_secs(1), 0, "http://localhost");
        assert!(matches!(zero_rate.validate(), Err(AppError::Config(_))));

        let zero_duration = LoadTestConfig::new(Duration::ZERO, 10, "http://localhost");
        assert!(matches!(zero_duration.validate(), Err(AppError::Config(_))));

        let no_workers = ok.clone().with_dispatch(DispatchMode::Pooled { workers: 0 });
        assert!(no_workers.validate().is_err());

        let forever = LoadTestConfig::new(Duration::MAX, 10, "http://localhost");
        assert!(matches!(forever.validate(), Err(AppError::Config(_))));

        assert!(LoadTestConfig::try_new(Duration::ZERO, 10, "http://localhost").is_err());
    }

    #[test]
    fn test_rate_above_one_tick_per_nanosecond_invalid() {
        let fastest = LoadTestConfig::new(Duration::from_secs(1), MAX_RATE, "http://localhost");
        assert!(fastest.validate().is_ok());
        assert_eq!(fastest.tick_interval(), Duration::from_nanos(1));

        let too_fast = LoadTestConfig::new(Duration::from_millis(50), 2_000_000_000, "http://localhost");
        let err = too_fast.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("at most 1000000000"));

        let mut config = valid_config();
        config.rate = 2_000_000_000;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_tick_interval() {
        let config = LoadTestConfig::new(Duration::from_secs(1), 10, "http://localhost");
        assert_eq!(config.tick_interval(), Duration::from_millis(100));

        let config = LoadTestConfig::new(Duration::from_secs(1), 3, "http://localhost");
        assert_eq!(config.tick_interval(), Duration::from_nanos(333_333_333));
        assert_eq!(config.expected_requests(), 3);
    }
}
