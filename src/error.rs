//! sportml error types

use std::fmt;
use std::time::Duration;

/// sportml error types
#[derive(Debug, thiserror::Error)]
pub enum SportmlError {
    // Inbound request errors
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("message too long: {chars} characters (limit {limit})")]
    MessageTooLong { chars: usize, limit: usize },

    #[error("rate limit exceeded for client, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited upstream, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider call cancelled")]
    Cancelled,

    /// Every candidate model of a hosted provider failed.
    ///
    /// `retryable` is set when at least one model failed transiently, so a
    /// later sweep has a chance of succeeding.
    #[error("all models unavailable ({tried} tried)")]
    AllModelsUnavailable { tried: usize, retryable: bool },

    #[error("service down: {0}")]
    ServiceDown(String),

    #[error("no suitable model installed")]
    NoSuitableModel,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from model")]
    EmptyResponse,

    // Configuration errors
    #[error("missing credential for provider {0}")]
    MissingCredential(String),

    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every usable provider was attempted and failed.
    #[error("all providers failed ({attempted} attempted, {skipped} skipped)")]
    AllProvidersFailed {
        attempted: usize,
        skipped: usize,
        /// Every attempted provider failed by timeout.
        timed_out: bool,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl SportmlError {
    /// Whether a retry of the same call might succeed.
    ///
    /// Upstream 429/502/503/504, network failures and timeouts are
    /// transient. Other 4xx statuses, malformed payloads, cancellation and
    /// configuration problems are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => is_retryable_status(*status),
            Self::AllModelsUnavailable { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Upstream `Retry-After` hint, if the provider sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Stable reason code for a provider failure.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Timeout(_) => FailureReason::Timeout,
            Self::Cancelled => FailureReason::Cancelled,
            Self::AllModelsUnavailable { .. } => FailureReason::AllModelsUnavailable,
            Self::ServiceDown(_) => FailureReason::ServiceDown,
            Self::NoSuitableModel => FailureReason::NoSuitableModel,
            Self::Json(_) | Self::EmptyResponse => FailureReason::InvalidResponse,
            Self::Api { .. } | Self::RateLimited { .. } => FailureReason::UpstreamStatus,
            Self::Http(_) => FailureReason::Network,
            Self::MissingCredential(_) | Self::NoProvider | Self::Configuration(_) => {
                FailureReason::MissingCredential
            }
            _ => FailureReason::Internal,
        }
    }

    /// Map a reqwest transport error.
    ///
    /// The URL is stripped; internal hostnames must not reach logs or replies.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        Self::Http(err.without_url().to_string())
    }
}

/// Upstream statuses worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Reason code attached to a failed provider attempt.
///
/// Used as the `reason` label on metrics and in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Timeout,
    Cancelled,
    AllModelsUnavailable,
    ServiceDown,
    NoSuitableModel,
    InvalidResponse,
    UpstreamStatus,
    Network,
    MissingCredential,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::AllModelsUnavailable => "ALL_MODELS_UNAVAILABLE",
            Self::ServiceDown => "SERVICE_DOWN",
            Self::NoSuitableModel => "NO_SUITABLE_MODEL",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::UpstreamStatus => "UPSTREAM_STATUS",
            Self::Network => "NETWORK",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for sportml operations
pub type Result<T> = std::result::Result<T, SportmlError>;
