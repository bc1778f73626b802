//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::RequestOrchestrator;
use crate::cache::{CacheConfig, ResponseCache};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::providers::{
    EnrichingAdapter, EnrichmentConfig, HostedChatAdapter, LocalGenerateAdapter,
    ProviderAdapter, ProviderRegistry, RetryConfig, ScheduleClient, ScheduleConfig,
};
use crate::types::{DEFAULT_MAX_MESSAGE_CHARS, ProviderDescriptor};
use crate::{Result, SportmlError};

/// Default deadline for one provider call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Main entry point for creating orchestrator instances.
pub struct Sportml;

impl Sportml {
    /// Create a new builder for configuring the orchestrator.
    pub fn builder() -> SportmlBuilder {
        SportmlBuilder::new()
    }
}

/// Per-provider behaviour toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderOptions {
    /// Retry transient failures with the builder's [`RetryConfig`].
    pub retry: bool,
    /// Prepend schedule context to keyword-matching messages.
    pub enrich: bool,
}

enum PendingAdapter {
    Hosted(ProviderDescriptor),
    Local(ProviderDescriptor),
    Custom(Arc<dyn ProviderAdapter>),
}

struct PendingProvider {
    priority: u32,
    adapter: PendingAdapter,
    options: ProviderOptions,
}

/// Builder for configuring orchestrator instances.
pub struct SportmlBuilder {
    rate_limit: RateLimitConfig,
    cache: Option<CacheConfig>,
    max_message_chars: usize,
    call_timeout: Duration,
    retry: RetryConfig,
    schedule: Option<ScheduleConfig>,
    enrichment: EnrichmentConfig,
    http_client: Option<reqwest::Client>,
    shutdown: CancellationToken,
    providers: Vec<PendingProvider>,
}

impl SportmlBuilder {
    pub fn new() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            cache: None,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryConfig::default(),
            schedule: None,
            enrichment: EnrichmentConfig::default(),
            http_client: None,
            shutdown: CancellationToken::new(),
            providers: Vec::new(),
        }
    }

    /// Set the per-client rate limit.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Enable the reply cache.
    ///
    /// Without it every request goes to the providers.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Set the maximum message length in characters (default 2000).
    pub fn max_message_chars(mut self, n: usize) -> Self {
        self.max_message_chars = n;
        self
    }

    /// Set the deadline applied to each provider call (default 15s).
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the retry policy used by providers registered with `retry: true`.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Enable the schedule feed (next-events lookups and enrichment source).
    pub fn schedule(mut self, config: ScheduleConfig) -> Self {
        self.schedule = Some(config);
        self
    }

    /// Set which messages enriched providers augment, and from which league.
    pub fn enrichment(mut self, config: EnrichmentConfig) -> Self {
        self.enrichment = config;
        self
    }

    /// Share one HTTP client across all built-in adapters.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use an externally owned root cancellation token.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Add a hosted chat-completion provider, with retry.
    pub fn hosted(self, descriptor: ProviderDescriptor) -> Self {
        self.hosted_with(
            descriptor,
            ProviderOptions {
                retry: true,
                enrich: false,
            },
        )
    }

    /// Add a hosted chat-completion provider with explicit options.
    pub fn hosted_with(mut self, descriptor: ProviderDescriptor, options: ProviderOptions) -> Self {
        self.providers.push(PendingProvider {
            priority: descriptor.priority,
            adapter: PendingAdapter::Hosted(descriptor),
            options,
        });
        self
    }

    /// Add a local generation provider, without retry.
    pub fn local(self, descriptor: ProviderDescriptor) -> Self {
        self.local_with(descriptor, ProviderOptions::default())
    }

    /// Add a local generation provider with explicit options.
    pub fn local_with(mut self, descriptor: ProviderDescriptor, options: ProviderOptions) -> Self {
        self.providers.push(PendingProvider {
            priority: descriptor.priority,
            adapter: PendingAdapter::Local(descriptor),
            options,
        });
        self
    }

    /// Add a caller-supplied adapter at `priority`.
    pub fn adapter(self, priority: u32, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapter_with(priority, adapter, ProviderOptions::default())
    }

    /// Add a caller-supplied adapter with explicit options.
    pub fn adapter_with(
        mut self,
        priority: u32,
        adapter: Arc<dyn ProviderAdapter>,
        options: ProviderOptions,
    ) -> Self {
        self.providers.push(PendingProvider {
            priority,
            adapter: PendingAdapter::Custom(adapter),
            options,
        });
        self
    }

    /// Build the orchestrator.
    ///
    /// Fails with [`SportmlError::NoProvider`] when no provider was added.
    pub fn build(self) -> Result<RequestOrchestrator> {
        if self.providers.is_empty() {
            return Err(SportmlError::NoProvider);
        }

        let http = match self.http_client {
            Some(client) => client,
            None => crate::providers::http::build_client(Duration::from_secs(5))?,
        };

        let needs_schedule = self.providers.iter().any(|p| p.options.enrich);
        let schedule = match self.schedule {
            Some(config) => Some(Arc::new(ScheduleClient::with_client(config, http.clone()))),
            None if needs_schedule => Some(Arc::new(ScheduleClient::with_client(
                ScheduleConfig::default(),
                http.clone(),
            ))),
            None => None,
        };

        let mut registry = ProviderRegistry::new();
        registry.set_call_timeout(self.call_timeout);

        for pending in self.providers {
            let mut adapter: Arc<dyn ProviderAdapter> = match pending.adapter {
                PendingAdapter::Hosted(descriptor) => {
                    Arc::new(HostedChatAdapter::with_client(descriptor, http.clone()))
                }
                PendingAdapter::Local(descriptor) => {
                    Arc::new(LocalGenerateAdapter::with_client(descriptor, http.clone()))
                }
                PendingAdapter::Custom(adapter) => adapter,
            };

            if let (true, Some(schedule)) = (pending.options.enrich, &schedule) {
                adapter = Arc::new(EnrichingAdapter::new(
                    adapter,
                    schedule.clone(),
                    self.enrichment.clone(),
                ));
            }

            if pending.options.retry {
                registry.add_with_retry(pending.priority, adapter, self.retry.clone());
            } else {
                registry.add(pending.priority, adapter);
            }
        }

        let cache = self
            .cache
            .map(|config| Arc::new(ResponseCache::new(&config)));

        Ok(RequestOrchestrator::new(
            Arc::new(RateLimiter::new(self.rate_limit)),
            cache,
            registry,
            schedule,
            self.max_message_chars,
            self.shutdown,
        ))
    }
}

impl Default for SportmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
