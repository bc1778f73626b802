//! Shared HTTP plumbing for the outbound adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::{Result, SportmlError};

/// Upper bound on upstream error text carried into errors and logs.
const MAX_ERROR_BODY: usize = 200;

/// Build the reqwest client shared by an adapter.
///
/// No overall timeout is set here; deadlines come from
/// [`TimeoutAdapter`](super::TimeoutAdapter) so they cover the whole call.
pub(crate) fn build_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(crate::version::user_agent())
        .build()
        .map_err(|e| SportmlError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into the matching error.
///
/// 429 becomes [`SportmlError::RateLimited`] with the upstream
/// `Retry-After` hint; everything else becomes [`SportmlError::Api`]
/// carrying a truncated body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        return Err(SportmlError::RateLimited {
            retry_after: parse_retry_after(response.headers()),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(SportmlError::Api {
        status: status.as_u16(),
        message: truncate(body.trim(), MAX_ERROR_BODY),
    })
}

/// Read the body and decode it as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(SportmlError::from_transport)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Truncate to at most `max` characters, on a character boundary.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn retry_after_http_date_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
