//! Retrying provider: per-attempt timeout plus bounded exponential backoff.
//!
//! Only transient failures are retried (see [`ProviderError::is_retryable`]).
//! A 4xx other than 408/429 fails immediately.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use voiceprint_core::error::ProviderError;
use voiceprint_core::provider::*;

/// Upper bound on a single backoff sleep, including server-requested ones.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Wraps a provider with timeout and retry behavior.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
    max_retries: u32,
    base_backoff: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
        }
    }

    /// Retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff.max(Duration::from_millis(10));
        self
    }

    fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let exponential = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
        let delay = match error {
            ProviderError::RateLimited { retry_after_secs } => {
                exponential.max(Duration::from_secs(*retry_after_secs))
            }
            _ => exponential,
        };
        delay.min(MAX_BACKOFF)
    }

    async fn attempt(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                self.inner.name(),
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.attempt(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(provider = %self.inner.name(), attempt, "Provider recovered after retries");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt, &e);
                    warn!(
                        provider = %self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if !e.is_retryable() {
                        warn!(provider = %self.inner.name(), error = %e, "Non-retryable provider error");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Streams are opened with a timeout but never retried; partial output
    /// may already have reached the caller.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        match tokio::time::timeout(self.timeout, self.inner.stream(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' stream did not open within {}s",
                self.inner.name(),
                self.timeout.as_secs()
            ))),
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
