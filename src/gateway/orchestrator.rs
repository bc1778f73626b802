//! The chat request state machine.
//!
//! ```text
//! Received ─► RateChecked ─► Validated ─► CacheChecked ─► ProviderAttempt(i) ─► Responded
//!    │             │              │              │                 │
//!    └─ 429        └─ 400         └─ hit: cached └─ all failed ────┴─► Failed (503/504)
//! ```
//!
//! [`RequestOrchestrator`] owns the injected stores (rate limiter, optional
//! reply cache) and the provider chain. It knows nothing about HTTP: it
//! returns a [`ChatReply`] or a [`SportmlError`], and the server maps the
//! latter to status codes. Each call yields exactly one outcome, and no
//! provider is called once a reply has been produced.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::limiter::RateLimiter;
use crate::providers::http::truncate;
use crate::providers::{CallContext, ProviderRegistry, ScheduleClient, ScheduleEvent};
use crate::telemetry;
use crate::types::{ChatReply, ChatRequest};
use crate::{Result, SportmlError};

/// Characters of the user message included in debug logs.
const LOGGED_MESSAGE_CHARS: usize = 50;

/// Transport-agnostic chat endpoint.
pub struct RequestOrchestrator {
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    registry: ProviderRegistry,
    schedule: Option<Arc<ScheduleClient>>,
    max_message_chars: usize,
    shutdown: CancellationToken,
}

impl RequestOrchestrator {
    pub(crate) fn new(
        limiter: Arc<RateLimiter>,
        cache: Option<Arc<ResponseCache>>,
        registry: ProviderRegistry,
        schedule: Option<Arc<ScheduleClient>>,
        max_message_chars: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            limiter,
            cache,
            registry,
            schedule,
            max_message_chars,
            shutdown,
        }
    }

    /// Handle a raw request body (`{"message": "..."}`) from `client_id`.
    #[instrument(skip(self, body), fields(client = client_id))]
    pub async fn handle(&self, client_id: &str, body: &[u8]) -> Result<ChatReply> {
        self.process(client_id, |limit| ChatRequest::from_json(body, client_id, limit))
            .await
    }

    /// Handle an already-extracted message from `client_id`.
    ///
    /// Same pipeline as [`handle`](Self::handle) minus JSON decoding.
    #[instrument(skip(self, message), fields(client = client_id))]
    pub async fn chat(&self, client_id: &str, message: &str) -> Result<ChatReply> {
        self.process(client_id, |limit| ChatRequest::new(message, client_id, limit))
            .await
    }

    /// Account for a request whose body could not be read at all.
    ///
    /// Admission still applies, so the result is either a rate-limit
    /// rejection or [`SportmlError::InvalidInput`] carrying `reason`.
    #[instrument(skip(self), fields(client = client_id))]
    pub async fn handle_unreadable(&self, client_id: &str, reason: &str) -> Result<ChatReply> {
        self.process(client_id, |_| Err(SportmlError::InvalidInput(reason.to_owned())))
            .await
    }

    /// Upper bound on message length, in characters.
    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    /// Next scheduled events for `league` (default league when `None`).
    pub async fn next_events(&self, league: Option<&str>) -> Result<Vec<ScheduleEvent>> {
        let schedule = self
            .schedule
            .as_ref()
            .ok_or_else(|| SportmlError::Configuration("schedule feed not configured".into()))?;
        let ctx = CallContext::new(self.shutdown.child_token());
        schedule.next_events(league, &ctx).await
    }

    /// The rate limiter guarding this orchestrator.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The reply cache, when enabled.
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    /// The provider chain.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Token cancelled on shutdown; every provider call runs under a child.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Cancel all in-flight provider calls.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // ========================================================================
    // Pipeline stages
    // ========================================================================

    async fn process<F>(&self, client_id: &str, parse: F) -> Result<ChatReply>
    where
        F: FnOnce(usize) -> Result<ChatRequest>,
    {
        let start = Instant::now();
        let result = self.run(client_id, parse, start).await;
        Self::record_outcome(&result, start);
        result
    }

    async fn run<F>(&self, client_id: &str, parse: F, start: Instant) -> Result<ChatReply>
    where
        F: FnOnce(usize) -> Result<ChatRequest>,
    {
        self.admit(client_id)?;
        let request = parse(self.max_message_chars)?;
        self.answer(&request, start).await
    }

    fn admit(&self, client_id: &str) -> Result<()> {
        if self.limiter.admit(client_id) {
            Ok(())
        } else {
            Err(SportmlError::RateLimitExceeded {
                retry_after: self.limiter.config().window,
            })
        }
    }

    async fn answer(&self, request: &ChatRequest, start: Instant) -> Result<ChatReply> {
        debug!(
            message = %truncate(&request.message, LOGGED_MESSAGE_CHARS),
            "chat request accepted"
        );

        if let Some(reply) = self.cache.as_ref().and_then(|c| c.get(&request.message)) {
            debug!("served from cache");
            return Ok(ChatReply::from_cache(reply, elapsed_ms(start)));
        }

        let ctx = CallContext::new(self.shutdown.child_token());
        let reply = self.registry.invoke(&request.message, &ctx).await?;

        if let Some(cache) = &self.cache {
            cache.put(&request.message, reply.text.clone());
        }
        Ok(ChatReply::from_provider(reply, elapsed_ms(start)))
    }

    fn record_outcome(result: &Result<ChatReply>, start: Instant) {
        let outcome = match result {
            Ok(reply) if reply.cached => "cached",
            Ok(_) => "ok",
            Err(SportmlError::RateLimitExceeded { .. }) => "rejected",
            Err(SportmlError::InvalidInput(_) | SportmlError::MessageTooLong { .. }) => "invalid",
            Err(SportmlError::AllProvidersFailed { .. } | SportmlError::NoProvider) => {
                "unavailable"
            }
            Err(_) => "error",
        };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
