//! HTTP mapping of [`SportmlError`].
//!
//! | error | status | body |
//! |---|---|---|
//! | invalid input, message too long | 400 | `{error}` |
//! | rate limit exceeded | 429 + `Retry-After` | `{error, retryAfter}` |
//! | all providers failed / none usable | 503 + `Retry-After` | `{error, suggestions}` |
//! | all attempted providers timed out | 504 + `Retry-After` | `{error, suggestions}` |
//! | anything else | 500 | `{error, details?}` |
//!
//! Messages are fixed, user-facing strings. Upstream detail only reaches the
//! body as `details` on 500s in the development environment.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::SportmlError;

/// Retry hint attached to 503/504 responses, in seconds.
pub const UNAVAILABLE_RETRY_AFTER_SECS: u64 = 60;

/// Error response body for HTTP endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Which endpoint produced the error; selects the wording of 503s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Chat,
    Events,
}

/// A [`SportmlError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    error: SportmlError,
    surface: Surface,
    expose_details: bool,
}

impl ApiError {
    /// Error from the chat endpoint.
    pub fn chat(error: SportmlError, expose_details: bool) -> Self {
        Self {
            error,
            surface: Surface::Chat,
            expose_details,
        }
    }

    /// Error from the schedule endpoint; every failure is an unavailable feed.
    pub fn events(error: SportmlError, expose_details: bool) -> Self {
        Self {
            error,
            surface: Surface::Events,
            expose_details,
        }
    }

    /// An uncaught fault (panic) caught at the outermost boundary.
    pub fn unexpected(detail: String, expose_details: bool) -> Self {
        Self::chat(SportmlError::Internal(detail), expose_details)
    }

    pub fn status(&self) -> StatusCode {
        if self.surface == Surface::Events {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        match &self.error {
            SportmlError::InvalidInput(_) | SportmlError::MessageTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            SportmlError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            SportmlError::AllProvidersFailed {
                timed_out: true, ..
            } => StatusCode::GATEWAY_TIMEOUT,
            SportmlError::AllProvidersFailed { .. }
            | SportmlError::NoProvider
            | SportmlError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self, status: StatusCode) -> ErrorResponse {
        let mut body = ErrorResponse {
            error: String::new(),
            retry_after: None,
            suggestions: None,
            details: None,
        };

        match status {
            StatusCode::BAD_REQUEST => body.error = bad_request_message(&self.error),
            StatusCode::TOO_MANY_REQUESTS => {
                let secs = match &self.error {
                    SportmlError::RateLimitExceeded { retry_after } => retry_after.as_secs(),
                    _ => UNAVAILABLE_RETRY_AFTER_SECS,
                };
                body.error = "Too many requests. Please wait a minute before asking again.".into();
                body.retry_after = Some(secs);
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                let (message, suggestions) = self.unavailable_message(status);
                body.error = message.into();
                body.suggestions = Some(suggestions.iter().map(|s| (*s).to_owned()).collect());
            }
            _ => {
                body.error = "An unexpected error occurred. Please try again.".into();
                if self.expose_details {
                    body.details = Some(self.error.to_string());
                }
            }
        }
        body
    }

    fn unavailable_message(&self, status: StatusCode) -> (&'static str, &'static [&'static str]) {
        if self.surface == Surface::Events {
            return (
                "The sports schedule is temporarily unavailable.",
                EVENTS_SUGGESTIONS,
            );
        }
        match (&self.error, status) {
            (SportmlError::Cancelled, _) => (
                "The server is restarting. Please try again shortly.",
                RESTART_SUGGESTIONS,
            ),
            (SportmlError::NoProvider, _) => (
                "No AI service is configured right now.",
                NO_PROVIDER_SUGGESTIONS,
            ),
            (_, StatusCode::GATEWAY_TIMEOUT) => (
                "The AI services took too long to answer.",
                TIMEOUT_SUGGESTIONS,
            ),
            _ => (
                "All AI services are temporarily unavailable.",
                UNAVAILABLE_SUGGESTIONS,
            ),
        }
    }
}

const UNAVAILABLE_SUGGESTIONS: &[&str] = &[
    "Try again in a minute.",
    "Rephrase or shorten your question.",
    "Check your internet connection.",
];

const TIMEOUT_SUGGESTIONS: &[&str] = &[
    "Try again in a minute.",
    "Ask a shorter or simpler question.",
    "Check your internet connection.",
];

const NO_PROVIDER_SUGGESTIONS: &[&str] = &[
    "Try again later.",
    "If you run this server, set GROQ_API_KEY or start Ollama locally.",
];

const RESTART_SUGGESTIONS: &[&str] = &["Retry your question in a few seconds."];

const EVENTS_SUGGESTIONS: &[&str] = &[
    "Try again in a minute.",
    "Check that the league id is correct.",
];

fn bad_request_message(error: &SportmlError) -> String {
    match error {
        SportmlError::MessageTooLong { chars, limit } => format!(
            "Message is too long ({chars} characters). Please keep it under {limit} characters."
        ),
        SportmlError::InvalidInput(reason) => {
            format!("Invalid request: {reason}. Send JSON like {{\"message\": \"Who won the last Champions League?\"}}.")
        }
        _ => "Invalid request.".into(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(status = status.as_u16(), error = %self.error, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.error, "request rejected");
        }

        let body = self.body(status);
        let retry_after = match status {
            StatusCode::TOO_MANY_REQUESTS => body.retry_after,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Some(UNAVAILABLE_RETRY_AFTER_SECS)
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
