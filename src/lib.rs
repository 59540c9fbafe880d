//! ktest
//!
//! A fixed-rate HTTP load generator. It drives a single endpoint at a target
//! request rate for a bounded time, records the latency and outcome of every
//! request, and reduces them to counts, error rate, throughput and p95/p99
//! latency percentiles.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use client::{HttpSampler, Sampler};
pub use error::{AppError, Result};
pub use executor::LoadEngine;
pub use models::{Config, LoadTestConfig, MetricsSummary, Sample};
pub use output::{render_json, render_text, OutputFormatterFactory, ReportFormatter};
pub use types::{DispatchMode, Outcome};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_DURATION: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_RATE: u32 = 100;
    /// Per-request timeout; expiry counts as a failed request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
