//! Gemini proxy - minimal reverse proxy for the Gemini generative-language API
//!
//! This library provides the core functionality for the proxy server. It
//! resolves an upstream API key per request, forwards the JSON body to the
//! matching `models/{model}:{action}` endpoint and streams the answer back.

pub mod config;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod streaming;

use std::time::Duration;

use anyhow::{Context, Result};

pub use crate::config::{Config, RouteVariant};
pub use crate::error::{ProxyError, ProxyResult};
pub use crate::keys::{KeyPolicy, KeyPool};
pub use crate::proxy::GeminiClient;
pub use crate::routes::create_router;

/// Connect timeout for upstream calls
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all request handlers
///
/// Read-only after startup.
pub struct AppState {
    pub config: Config,
    /// Upstream client for the Gemini models endpoint
    pub gemini: GeminiClient,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        let gemini = GeminiClient::new(build_http_client(&config)?, &config);

        Ok(Self { config, gemini })
    }
}

/// Build the upstream HTTP client
///
/// Only the configured outbound proxy is used; reqwest's own environment
/// lookup is disabled so configuration stays the single source.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .no_proxy()
        .connect_timeout(CONNECT_TIMEOUT);

    if let Some(proxy_url) = &config.proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url).context("Invalid outbound proxy URL")?;
        builder = builder.proxy(proxy);
    }

    // No total timeout by default: streamed generations can run for minutes
    if let Some(seconds) = config.upstream_timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    builder.build().context("Failed to build HTTP client")
}
