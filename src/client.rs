//! Request sampling: issue one request and measure it


use crate::{
    defaults::REQUEST_TIMEOUT,
    error::{AppError, Result},
    logging::RunLogger,
    models::Sample,
    types::Outcome,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Produces one measured request per call.
///
/// Failures of the target are never errors here: they come back as a
/// [`Sample`] with [`Outcome::Failure`]. Implementations must be safe to call
/// from several tasks at once.
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Sample;
}

/// Sampler that sends `GET` requests to a fixed endpoint
pub struct HttpSampler {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    run_logger: Option<Arc<RunLogger>>,
}

impl HttpSampler {
    /// Create a sampler with the default per-request timeout
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, REQUEST_TIMEOUT)
    }

    /// Create a sampler with a custom per-request timeout
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ktest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            run_logger: None,
        })
    }

    /// Report transport errors through a run logger
    pub fn with_logger(mut self, run_logger: Arc<RunLogger>) -> Self {
        self.run_logger = Some(run_logger);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn report(&self, error: AppError, latency: Duration) {
        if let Some(run_logger) = &self.run_logger {
            run_logger.log_request_error(self.endpoint.as_str(), &error, latency).await;
        }
    }
}

#[async_trait]
impl Sampler for HttpSampler {
    async fn sample(&self) -> Sample {
        let start = Instant::now();
        let result = self.client.get(self.endpoint.clone()).send().await;
        let latency = start.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.report(AppError::from(e), latency).await;
                return Sample::failure(latency);
            }
        };

        let outcome = Outcome::from_status(response.status().as_u16());

        // Drain the body so the connection can be reused; a body that cannot
        // be read within the timeout fails the request.
        match response.bytes().await {
            Ok(_) => Sample::new(latency, outcome),
            Err(e) => {
                self.report(AppError::from(e), start.elapsed()).await;
                Sample::failure(latency)
            }
        }
    }
}
