//! Data models and structures for the load tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, LoadTestConfig};
pub use metrics::{MetricsSummary, Sample};
