//! Retry configuration, the retry decision, and the retrying decorator.
//!
//! The policy is a pure function: [`RetryConfig::decide`] maps an attempt
//! number and the error it produced to a [`RetryDecision`]. The loop in
//! `with_retry()` drives it, sleeping between attempts; the sleep is a
//! suspension point that honours cancellation.
//!
//! Only transient errors (see [`SportmlError::is_transient`]) are retried:
//! upstream 429/502/503/504, network failures, timeouts, and model sweeps
//! that failed for at least one of those reasons.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::telemetry;

use super::traits::{CallContext, ProviderAdapter};
use crate::types::ProviderReply;
use crate::{Result, SportmlError};

/// Configuration for retry behaviour on transient errors.
///
/// Exponential backoff starting at `initial_delay`, doubling per attempt
/// and capped at `max_delay`:
///
/// ```rust
/// # use sportml::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .initial_delay(Duration::from_secs(1))
///     .max_delay(Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries, upstream hints included. Default: 4s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again.
    RetryAfter(Duration),
    /// Return the error to the caller.
    GiveUp,
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff for a given attempt number (0-indexed).
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Decide whether attempt `attempt` (0-indexed), which failed with
    /// `error`, is followed by another.
    ///
    /// Permanent errors give up immediately, as does the last permitted
    /// attempt. An upstream `Retry-After` hint replaces the computed
    /// backoff but is still capped at `max_delay`.
    pub fn decide(&self, attempt: u32, error: &SportmlError) -> RetryDecision {
        if !error.is_transient() || attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        let delay = match error.retry_after() {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        };
        RetryDecision::RetryAfter(delay)
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Drives [`RetryConfig::decide`] until it gives up or `f` succeeds. The
/// backoff sleep races `ctx`, so a cancelled call stops waiting at once.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    ctx: &CallContext,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match f().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        match config.decide(attempt, &err) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "provider" => provider_name.to_owned(),
                )
                .increment(1);
                warn!(
                    provider = provider_name,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                ctx.run(async {
                    tokio::time::sleep(delay).await;
                    Ok(())
                })
                .await?;
                attempt += 1;
            }
        }
    }
}

// ============================================================================
// RetryingAdapter
// ============================================================================

/// Decorator that wraps a [`ProviderAdapter`] with retry logic.
///
/// Used for hosted providers: the inner adapter sweeps its model list once
/// per attempt, and a sweep that failed transiently is retried as a whole.
/// Permanent failures are returned immediately so the registry can fall
/// through to the next provider.
pub struct RetryingAdapter {
    inner: Arc<dyn ProviderAdapter>,
    config: RetryConfig,
}

impl RetryingAdapter {
    /// Wrap an adapter with retry logic.
    pub fn new(inner: Arc<dyn ProviderAdapter>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl ProviderAdapter for RetryingAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        with_retry(&self.config, self.inner.name(), ctx, || {
            self.inner.invoke(message, ctx)
        })
        .await
    }
}
