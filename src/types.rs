//! Type definitions and aliases

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Classification of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Response arrived within the request timeout with a 2xx status
    Success,
    /// Non-2xx status, transport error or timeout
    Failure,
}

impl Outcome {
    /// Classify an HTTP status code; only 200..=299 counts as success
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// How the load engine turns cadence ticks into requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchMode {
    /// One request per tick, awaited before the next tick is consumed.
    /// A slow target lowers the achieved rate; samples keep dispatch order.
    Serialized,
    /// Each tick spawns a request; at most `workers` are in flight.
    /// Samples are recorded in completion order.
    Pooled { workers: usize },
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Serialized
    }
}

impl DispatchMode {
    /// Pool size used for `--workers auto`: sixteen in-flight requests per CPU
    pub fn auto_workers() -> usize {
        num_cpus::get().max(1) * 16
    }

    pub fn name(&self) -> String {
        match self {
            Self::Serialized => "serialized".to_string(),
            Self::Pooled { workers } => format!("pooled ({} workers)", workers),
        }
    }
}
