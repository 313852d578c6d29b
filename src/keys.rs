//! Upstream API key resolution
//!
//! Two mutually exclusive policies decide which key a request is forwarded with:
//! - [`KeyPolicy::Pool`]: a caller-supplied bearer token wins, otherwise a key is
//!   drawn at random from the configured pool.
//! - [`KeyPolicy::PassThrough`]: the caller must supply the key (`?key=` or bearer
//!   token); there is no pool to fall back on.

use std::fmt;

use axum::http::{header, HeaderMap};
use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

use crate::error::ProxyError;

/// Errors raised while building a key pool
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyPoolError {
    #[error("key pool must contain at least one key")]
    Empty,

    #[error("key at index {0} is empty")]
    EmptyKey(usize),
}

/// Immutable, non-empty set of upstream API keys
#[derive(Clone)]
pub struct KeyPool {
    keys: Vec<String>,
}

impl KeyPool {
    /// Build a pool, rejecting empty pools and empty keys
    pub fn new(keys: Vec<String>) -> Result<Self, KeyPoolError> {
        if keys.is_empty() {
            return Err(KeyPoolError::Empty);
        }
        if let Some(index) = keys.iter().position(|key| key.is_empty()) {
            return Err(KeyPoolError::EmptyKey(index));
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Pick one key uniformly at random
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // Non-empty by construction
        self.keys.choose(rng).map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool")
            .field("size", &self.keys.len())
            .finish()
    }
}

/// Key resolution strategy, selected once at startup
#[derive(Debug, Clone)]
pub enum KeyPolicy {
    Pool(KeyPool),
    PassThrough,
}

impl KeyPolicy {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            KeyPolicy::Pool(_) => "pool",
            KeyPolicy::PassThrough => "passthrough",
        }
    }

    /// Resolve the key for one request
    pub fn resolve(&self, query_key: Option<&str>, headers: &HeaderMap) -> Result<String, ProxyError> {
        self.resolve_with(query_key, headers, &mut rand::rng())
    }

    /// Resolve the key for one request using the given random source
    pub fn resolve_with<R: Rng + ?Sized>(
        &self,
        query_key: Option<&str>,
        headers: &HeaderMap,
        rng: &mut R,
    ) -> Result<String, ProxyError> {
        let bearer = bearer_from_headers(headers);

        match self {
            KeyPolicy::Pool(pool) => Ok(bearer
                .map(str::to_string)
                .unwrap_or_else(|| pool.pick(rng).to_string())),
            KeyPolicy::PassThrough => query_key
                .filter(|key| !key.is_empty())
                .or(bearer)
                .map(str::to_string)
                .ok_or(ProxyError::MissingApiKey),
        }
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .filter(|token| !token.is_empty())
}
