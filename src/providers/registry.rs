//! Provider registry with fallback chain semantics.
//!
//! The `ProviderRegistry` keeps adapters sorted by ascending priority
//! (lower = tried first; equal priorities keep registration order) and
//! tries them strictly one after another until one answers.
//!
//! # Skips vs failures
//!
//! An adapter that reports `is_configured() == false` (a hosted provider
//! without its credential) is skipped: it is not called, not counted as an
//! attempt, and shows up only in `sportml_provider_skipped_total` and an
//! info log. Any error from an attempted adapter is a failure and the chain
//! moves on, whatever the error kind.
//!
//! # Wrapping
//!
//! At registration each adapter is wrapped, innermost first, in a
//! [`TimeoutAdapter`] (when a call timeout is set) and, for adapters added
//! with [`add_with_retry`](ProviderRegistry::add_with_retry), a
//! [`RetryingAdapter`]. Every retry attempt gets a fresh deadline.
//!
//! ```text
//!  invoke("who won?")
//!        │
//!        ▼
//!  ┌───────────────┐  missing key   ┌───────────────┐  ok   ┌───────┐
//!  │ groq (p=1)    │ ─────────────► │ ollama (p=2)  │ ────► │ reply │
//!  │ skipped       │                │ attempted     │       └───────┘
//!  └───────────────┘                └───────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::telemetry;

use super::cancel::TimeoutAdapter;
use super::retry::{RetryConfig, RetryingAdapter};
use super::traits::{CallContext, ProviderAdapter};
use crate::types::ProviderReply;
use crate::{Result, SportmlError};

struct RegisteredProvider {
    priority: u32,
    adapter: Arc<dyn ProviderAdapter>,
}

/// Priority-ordered chain of provider adapters.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
    call_timeout: Option<Duration>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each adapter call by `timeout`.
    ///
    /// Applies to adapters registered after this call.
    pub fn set_call_timeout(&mut self, timeout: Duration) {
        self.call_timeout = Some(timeout);
    }

    /// Register an adapter at `priority`.
    pub fn add(&mut self, priority: u32, adapter: Arc<dyn ProviderAdapter>) {
        let adapter = self.maybe_wrap_timeout(adapter);
        self.insert(priority, adapter);
    }

    /// Register an adapter at `priority`, retrying transient failures.
    pub fn add_with_retry(
        &mut self,
        priority: u32,
        adapter: Arc<dyn ProviderAdapter>,
        retry: RetryConfig,
    ) {
        let adapter = self.maybe_wrap_timeout(adapter);
        self.insert(priority, Arc::new(RetryingAdapter::new(adapter, retry)));
    }

    /// Provider names in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.adapter.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Number of registered providers that can actually be called.
    pub fn usable(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| p.adapter.is_configured())
            .count()
    }

    // ========================================================================
    // Fallback chain execution
    // ========================================================================

    /// Answer `message` with the first provider that succeeds.
    ///
    /// Fails with [`SportmlError::NoProvider`] when no provider could be
    /// attempted, and [`SportmlError::AllProvidersFailed`] when all
    /// attempted providers failed.
    #[instrument(skip(self, message, ctx), fields(operation = "chat"))]
    pub async fn invoke(&self, message: &str, ctx: &CallContext) -> Result<ProviderReply> {
        let mut attempted = 0;
        let mut skipped = 0;
        let mut all_timed_out = true;

        for entry in &self.providers {
            let provider = entry.adapter.name();
            if !entry.adapter.is_configured() {
                skipped += 1;
                metrics::counter!(telemetry::PROVIDER_SKIPPED_TOTAL,
                    "provider" => provider.to_owned(),
                )
                .increment(1);
                info!(provider, priority = entry.priority, "skipping provider without credential");
                continue;
            }
            if ctx.is_cancelled() {
                return Err(SportmlError::Cancelled);
            }

            attempted += 1;
            let start = Instant::now();
            match entry.adapter.invoke(message, ctx).await {
                Ok(reply) => {
                    Self::record_attempt(provider, None);
                    info!(
                        provider,
                        model = %reply.model,
                        attempt = attempted,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "provider answered"
                    );
                    return Ok(reply);
                }
                Err(SportmlError::Cancelled) if ctx.is_cancelled() => {
                    Self::record_attempt(provider, Some(&SportmlError::Cancelled));
                    return Err(SportmlError::Cancelled);
                }
                Err(e) => {
                    Self::record_attempt(provider, Some(&e));
                    all_timed_out &= matches!(e, SportmlError::Timeout(_));
                    warn!(
                        provider,
                        attempt = attempted,
                        reason = %e.reason(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "provider failed, trying next"
                    );
                }
            }
        }

        if attempted == 0 {
            warn!(skipped, "no usable provider");
            return Err(SportmlError::NoProvider);
        }
        Err(SportmlError::AllProvidersFailed {
            attempted,
            skipped,
            timed_out: all_timed_out,
        })
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn insert(&mut self, priority: u32, adapter: Arc<dyn ProviderAdapter>) {
        // After every entry with priority <= this one: stable for ties.
        let index = self
            .providers
            .partition_point(|existing| existing.priority <= priority);
        self.providers
            .insert(index, RegisteredProvider { priority, adapter });
    }

    fn maybe_wrap_timeout(&self, adapter: Arc<dyn ProviderAdapter>) -> Arc<dyn ProviderAdapter> {
        match self.call_timeout {
            Some(timeout) => Arc::new(TimeoutAdapter::new(adapter, timeout)),
            None => adapter,
        }
    }

    fn record_attempt(provider: &str, error: Option<&SportmlError>) {
        match error {
            None => metrics::counter!(telemetry::PROVIDER_ATTEMPTS_TOTAL,
                "provider" => provider.to_owned(),
                "status" => "ok",
            )
            .increment(1),
            Some(e) => metrics::counter!(telemetry::PROVIDER_ATTEMPTS_TOTAL,
                "provider" => provider.to_owned(),
                "status" => "error",
                "reason" => e.reason().as_str(),
            )
            .increment(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl ProviderAdapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, _message: &str, _ctx: &CallContext) -> Result<ProviderReply> {
            Err(SportmlError::EmptyResponse)
        }
    }

    #[test]
    fn providers_sorted_by_priority_stable_on_ties() {
        let mut registry = ProviderRegistry::new();
        registry.add(3, Arc::new(Named("c")));
        registry.add(1, Arc::new(Named("a")));
        registry.add(2, Arc::new(Named("b1")));
        registry.add(2, Arc::new(Named("b2")));
        assert_eq!(registry.provider_names(), vec!["a", "b1", "b2", "c"]);
    }

    #[tokio::test]
    async fn empty_registry_has_no_provider() {
        let registry = ProviderRegistry::new();
        let err = registry
            .invoke("hi", &CallContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SportmlError::NoProvider));
    }

    #[tokio::test]
    async fn non_timeout_failure_is_not_marked_timed_out() {
        let mut registry = ProviderRegistry::new();
        registry.add(1, Arc::new(Named("a")));
        let err = registry
            .invoke("hi", &CallContext::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SportmlError::AllProvidersFailed {
                attempted: 1,
                skipped: 0,
                timed_out: false
            }
        ));
    }
}
