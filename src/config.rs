//! Configuration management for the Gemini proxy
//!
//! Configuration is loaded from environment variables.

use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;

use crate::keys::{KeyPolicy, KeyPool};

/// Upstream endpoint every request is forwarded to
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model used when the route does not name one
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.0-flash";

/// Which inbound route shape the proxy exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVariant {
    /// `/v1beta/models/...` routes mirroring the upstream URL shape
    Models,
    /// Single `POST /` route, streaming unless `?stream=false`
    Root,
}

impl RouteVariant {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "models" => Ok(Self::Models),
            "root" => Ok(Self::Root),
            other => bail!("Invalid ROUTE_VARIANT '{}': expected 'models' or 'root'", other),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Model used when the path carries none
    pub model_name: String,
    /// Upstream models endpoint
    pub base_url: String,
    /// Optional outbound proxy tunnel
    pub proxy_url: Option<String>,
    /// Optional total timeout for upstream calls (in seconds)
    pub upstream_timeout_seconds: Option<u64>,

    /// How the upstream key is chosen for each request
    pub key_policy: KeyPolicy,
    /// Exposed route shape
    pub route_variant: RouteVariant,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let key_policy = match env::var("KEY_POLICY")
            .unwrap_or_else(|_| "pool".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "pool" => {
                let raw = env::var("API_KEYS")
                    .context("API_KEYS must be set when KEY_POLICY is 'pool'")?;
                KeyPolicy::Pool(parse_api_keys(&raw)?)
            }
            "passthrough" | "pass-through" => KeyPolicy::PassThrough,
            other => bail!(
                "Invalid KEY_POLICY '{}': expected 'pool' or 'passthrough'",
                other
            ),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,

            model_name: env::var("MODEL_NAME")
                .ok()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            base_url: GEMINI_BASE_URL.to_string(),
            proxy_url: env::var("HTTPS_PROXY")
                .or_else(|_| env::var("HTTP_PROXY"))
                .ok()
                .filter(|url| !url.is_empty()),
            upstream_timeout_seconds: env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid UPSTREAM_TIMEOUT_SECS")?,

            key_policy,
            route_variant: RouteVariant::parse(
                &env::var("ROUTE_VARIANT").unwrap_or_else(|_| "models".to_string()),
            )?,
        })
    }
}

// Keys stay out of Debug output so startup logs and panics can't leak them.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("proxy_configured", &self.proxy_url.is_some())
            .field("upstream_timeout_seconds", &self.upstream_timeout_seconds)
            .field("key_policy", &self.key_policy)
            .field("route_variant", &self.route_variant)
            .finish()
    }
}

/// Parse the `API_KEYS` JSON array into a key pool
pub fn parse_api_keys(raw: &str) -> Result<KeyPool> {
    let keys: Vec<String> =
        serde_json::from_str(raw).context("API_KEYS must be a JSON array of strings")?;
    KeyPool::new(keys).context("Invalid API_KEYS")
}
