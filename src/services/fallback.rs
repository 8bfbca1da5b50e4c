//! Fallback execution across the provider chain.
//!
//! The chain runs strictly sequentially: speculative fan-out would
//! double-charge and break cost attribution. Each failed attempt is counted
//! and logged before the executor advances.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::core::metrics::get_metrics;
use crate::providers::{LlmProvider, ProviderError, ProviderRequest, ProviderResponse};

/// Pause between attempts, giving transient upstream failures a moment to
/// clear before the next provider is tried.
const INTER_ATTEMPT_DELAY: Duration = Duration::from_millis(500);

/// Executor knobs.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Wrap each single attempt in [`retry_with_backoff`]. Off by default:
    /// the three-provider chain already gives three tries.
    pub retry_per_attempt: bool,
}

/// Outcome of a successful chain execution.
#[derive(Debug)]
pub struct ExecutionSuccess {
    pub response: ProviderResponse,
    /// Name of the provider that served the request
    pub provider: &'static str,
    /// Zero-based position in the chain
    pub attempt_index: usize,
    pub fallback_used: bool,
}

/// Exponential backoff parameters for the optional per-attempt retry.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub exponential_base: f64,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            exponential_base: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Retry one operation with exponential backoff.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    policy: &BackoffPolicy,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut delay = policy.initial_delay;
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                last_error = Some(error);
                if attempt + 1 < policy.max_attempts {
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(policy.exponential_base).min(policy.max_delay);
                }
            }
        }
    }

    Err(last_error.expect("max_attempts must be at least 1"))
}

/// Walk the chain until an attempt succeeds or every provider has failed.
///
/// Returns the last classified error when the chain is exhausted; the
/// caller maps that to its terminal error type.
pub async fn call_with_fallback(
    chain: &[Arc<dyn LlmProvider>],
    request: &ProviderRequest,
    timeout: Duration,
    request_id: &str,
    api_key_id: Uuid,
    options: &ExecutorOptions,
) -> Result<ExecutionSuccess, ProviderError> {
    let metrics = get_metrics();
    let api_key_label = api_key_id.to_string();
    let mut last_error: Option<ProviderError> = None;

    for (index, provider) in chain.iter().enumerate() {
        let result = if options.retry_per_attempt {
            retry_with_backoff(
                || provider.invoke(request, timeout),
                &BackoffPolicy::default(),
            )
            .await
        } else {
            provider.invoke(request, timeout).await
        };

        match result {
            Ok(response) => {
                let fallback_used = index > 0;
                if fallback_used {
                    metrics
                        .fallbacks_total
                        .with_label_values(&[&api_key_label, chain[0].name(), provider.name()])
                        .inc();
                }
                tracing::info!(
                    request_id = %request_id,
                    api_key_id = %api_key_label,
                    provider = provider.name(),
                    attempt = index,
                    fallback_used,
                    latency_ms = response.latency_ms,
                    "Provider attempt succeeded"
                );
                return Ok(ExecutionSuccess {
                    response,
                    provider: provider.name(),
                    attempt_index: index,
                    fallback_used,
                });
            }
            Err(error) => {
                metrics
                    .errors_total
                    .with_label_values(&[&api_key_label, provider.name(), error.error_type()])
                    .inc();
                tracing::warn!(
                    request_id = %request_id,
                    api_key_id = %api_key_label,
                    provider = provider.name(),
                    attempt = index,
                    error_type = error.error_type(),
                    error = %error,
                    "Provider attempt failed"
                );
                last_error = Some(error);

                if index + 1 < chain.len() {
                    tokio::time::sleep(INTER_ATTEMPT_DELAY).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or(ProviderError::Upstream {
        provider: "none",
        message: "no providers available".to_string(),
    }))
}
