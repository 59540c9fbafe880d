//! Structured logging for the load tester
//!
//! This module provides:
//! - Leveled log entries with structured fields and correlation IDs
//! - Console and JSON output formats
//! - A run logger that records load-run lifecycle events and per-request detail
//!
//! Log lines never carry the final report; rendering lives in [`crate::output`].

use crate::error::AppError;
use crate::models::{Config, LoadTestConfig, MetricsSummary, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-request detail
    Debug = 0,
    /// Run lifecycle events
    Info = 1,
    /// Environment problems and runs with failed requests
    Warn = 2,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    /// Send every line to stderr so stdout stays machine-readable
    stderr_only: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            stderr_only: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger configured from the application settings
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            stderr_only: config.json_output,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        drop(context);

        let output = self.render(&entry);

        if self.stderr_only || entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id.as_str());
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Attach a sample's latency and outcome
    pub fn sample(self, sample: &Sample) -> Self {
        self.field("latency_ms", sample.latency_ms())
            .field("outcome", sample.outcome)
    }

    /// Attach the headline numbers of a summary
    pub fn summary(self, summary: &MetricsSummary) -> Self {
        self.field("total_requests", summary.total_requests)
            .field("success_count", summary.success_count)
            .field("failure_count", summary.failure_count)
            .field("avg_ms", summary.average_ms())
            .field("p95_ms", summary.p95_ms())
            .field("p99_ms", summary.p99_ms())
            .field("throughput", summary.throughput)
            .field("error_rate", summary.error_rate)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    fn into_entry(self) -> LogEntry {
        self.entry
    }
}

/// Records the lifecycle of load runs
pub struct RunLogger {
    logger: Logger,
}

impl RunLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("LOAD".to_string(), config),
        }
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log the start of a run and return its correlation ID
    pub async fn log_run_start(&self, config: &LoadTestConfig) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.logger.info(&format!("Starting load run against {}", config.endpoint))
            .correlation_id(&correlation_id)
            .field("endpoint", &config.endpoint)
            .field("target_rate", config.target_rate)
            .field("duration_ms", config.duration.as_millis() as u64)
            .field("tick_interval_us", config.tick_interval().as_micros() as u64)
            .field("dispatch", config.dispatch.name())
            .log()
            .await;
        correlation_id
    }

    /// Log one completed request
    pub async fn log_sample(&self, correlation_id: &str, sequence: u64, sample: &Sample) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }
        self.logger.debug(&format!("Request {} -> {:?} in {:.1}ms", sequence, sample.outcome, sample.latency_ms()))
            .correlation_id(correlation_id)
            .field("sequence", sequence)
            .sample(sample)
            .log()
            .await;
    }

    /// Log a transport error that was recorded as a failed sample
    pub async fn log_request_error(&self, endpoint: &str, error: &AppError, latency: Duration) {
        self.logger.debug(&format!("GET {} failed: {}", endpoint, error))
            .field("endpoint", endpoint)
            .field("latency_ms", latency.as_secs_f64() * 1000.0)
            .error_info(error)
            .log()
            .await;
    }

    /// Log a request task that ended without a sample
    pub async fn log_task_failure(&self, correlation_id: &str, error: &str) {
        self.logger.warn(&format!("Request task failed: {}", error))
            .correlation_id(correlation_id)
            .field("error", error)
            .log()
            .await;
    }

    /// Log why the drive loop stopped
    pub async fn log_stop(&self, correlation_id: &str, reason: &str, in_flight: usize) {
        self.logger.info(&format!("Load run stopping: {}", reason))
            .correlation_id(correlation_id)
            .field("reason", reason)
            .field("in_flight", in_flight)
            .log()
            .await;
    }

    /// Log the reduced summary of a run
    pub async fn log_run_complete(&self, correlation_id: &str, summary: &MetricsSummary) {
        let level = if summary.failure_count > 0 { LogLevel::Warn } else { LogLevel::Info };
        self.logger.log(level, &format!(
            "Load run completed: {} requests, {:.2}% errors, {:.2} req/s",
            summary.total_requests, summary.error_rate, summary.throughput
        ))
            .correlation_id(correlation_id)
            .summary(summary)
            .log()
            .await;
    }
}

/// Creates loggers that share one session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_run_logger(&self) -> RunLogger {
        RunLogger::from_logger(self.create_logger("LOAD").await)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}
