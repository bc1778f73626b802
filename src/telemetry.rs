//! Telemetry metric name constants.
//!
//! Centralised metric names for sportml operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `sportml_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` - provider name (e.g. "groq", "ollama")
//! - `outcome` - inbound result: "ok", "cached", "rejected", "invalid",
//!   "unavailable", "error"
//! - `status` - provider attempt outcome: "ok" or "error"
//! - `reason` - [`FailureReason`](crate::error::FailureReason) code

/// Inbound chat requests handled by the orchestrator.
///
/// Labels: `outcome`.
pub const REQUESTS_TOTAL: &str = "sportml_requests_total";

/// End-to-end chat request duration in seconds.
///
/// Labels: `outcome`.
pub const REQUEST_DURATION_SECONDS: &str = "sportml_request_duration_seconds";

/// Provider attempts made by the registry (skipped providers excluded).
///
/// Labels: `provider`, `status`, `reason` (errors only).
pub const PROVIDER_ATTEMPTS_TOTAL: &str = "sportml_provider_attempts_total";

/// Providers skipped because a required credential is missing.
///
/// Labels: `provider`.
pub const PROVIDER_SKIPPED_TOTAL: &str = "sportml_provider_skipped_total";

/// Total retry attempts (not counting the initial call).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "sportml_retries_total";

/// Response cache hits.
pub const CACHE_HITS_TOTAL: &str = "sportml_cache_hits_total";

/// Response cache misses (including expired entries).
pub const CACHE_MISSES_TOTAL: &str = "sportml_cache_misses_total";

/// Entries removed from the response cache by TTL expiry or capacity eviction.
///
/// Labels: `cause` ("ttl" | "capacity").
pub const CACHE_EVICTIONS_TOTAL: &str = "sportml_cache_evictions_total";

/// Requests rejected by the per-client rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "sportml_rate_limited_total";

/// Schedule enrichment fetches that failed and were skipped.
pub const ENRICHMENT_FAILURES_TOTAL: &str = "sportml_enrichment_failures_total";
