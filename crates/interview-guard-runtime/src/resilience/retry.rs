//! Bounded transport retries for a single logical model call.
//!
//! Every attempt resends the same messages under its own timeout. Only
//! transient errors are retried; the delays grow exponentially between
//! `min_backoff` and `max_backoff`. This counter is independent of the
//! orchestrator's repair budget.

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::config::human_duration;
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
};

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportRetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: usize,

    /// Delay before the first retry
    #[serde(with = "human_duration")]
    pub min_backoff: Duration,

    /// Upper bound on any single delay
    #[serde(with = "human_duration")]
    pub max_backoff: Duration,
}

impl Default for TransportRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl TransportRetryConfig {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_backoff)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_retries)
    }
}

/// Result of one logical call after all transport attempts.
#[derive(Debug)]
pub struct TransportOutcome {
    pub response: Result<CompletionResponse, ProviderError>,

    /// Physical attempts made, including the first
    pub attempts: u32,
}

/// Calls `provider` with retry on transient errors and a per-attempt timeout.
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    messages: &[ChatMessage],
    completion: &CompletionConfig,
    policy: &TransportRetryConfig,
    attempt_timeout: Duration,
) -> TransportOutcome {
    let attempts = AtomicU32::new(0);
    let counter = &attempts;

    let attempt = || async move {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(provider = provider.name(), attempt = n, "sending completion request");

        match tokio::time::timeout(attempt_timeout, provider.complete(messages.to_vec(), completion))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(attempt_timeout)),
        }
    };

    let response = attempt
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &ProviderError| e.is_transient())
        .notify(|e: &ProviderError, delay: Duration| {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                delay = ?delay,
                "Transient transport error, retrying"
            );
        })
        .await;

    TransportOutcome {
        response,
        attempts: attempts.load(Ordering::Relaxed),
    }
}
