//! Client identity for rate limiting.
//!
//! Taken from proxy headers in order: the first hop of `x-forwarded-for`,
//! then `x-real-ip`, then `cf-connecting-ip`. Requests carrying none of
//! them share the [`UNKNOWN_CLIENT`] bucket.

use axum::http::HeaderMap;

/// Identity shared by every request without a forwarding header.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FALLBACK_HEADERS: [&str; 2] = ["x-real-ip", "cf-connecting-ip"];

/// Derive the rate-limit identity of a request.
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    forwarded
        .or_else(|| {
            FALLBACK_HEADERS
                .iter()
                .filter_map(|name| header_str(headers, name))
                .map(str::trim)
                .find(|value| !value.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_owned()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
