//! Header utilities for upstream proxying
//!
//! Client headers are never forwarded upstream; the outbound request carries a
//! fixed header set. On the way back only a small whitelist of upstream headers
//! reaches the client.

use axum::http::header::{self, HeaderName};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};

/// User-Agent sent upstream, mimicking a plain command-line client
pub const UPSTREAM_USER_AGENT: &str = "curl/7.64.1";

/// Upstream response headers copied onto the relayed response
const RELAYED_HEADERS: &[HeaderName] = &[header::CONTENT_TYPE, header::CONTENT_LENGTH];

/// Build the fixed header set for upstream requests
pub fn build_upstream_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(UPSTREAM_USER_AGENT));

    headers
}

/// Select the headers of a successful upstream response that reach the client
pub fn relay_headers(upstream: &HeaderMap, streaming: bool) -> HeaderMap {
    let mut relayed = HeaderMap::new();

    for name in RELAYED_HEADERS {
        if let Some(value) = upstream.get(name) {
            relayed.insert(name.clone(), value.clone());
        }
    }

    if streaming {
        relayed.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    }
    relayed.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    relayed
}
