//! Timeout and bounded retry around external provider calls
//!
//! Transient failures (request errors, timeouts) are retried with
//! exponential backoff. Authorization and unavailability are returned
//! immediately.

use crate::error::ProviderError;
use crate::observability::AgentMetrics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// Run `op` under the policy, labelling metrics with `provider`
pub async fn retry<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    metrics: &AgentMetrics,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    provider = %provider,
                    error = %e,
                    attempt = attempt,
                    next_backoff_ms = backoff.as_millis() as u64,
                    "Provider call failed, retrying"
                );
                metrics.inc_provider_retry(provider);
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, policy.max_backoff);
                attempt += 1;
            }
            Err(e) => {
                debug!(provider = %provider, error = %e, attempt = attempt, "Provider call gave up");
                metrics.inc_provider_error(provider, e.kind());
                return Err(e);
            }
        }
    }
}
