//! Gemini upstream client
//!
//! Issues the upstream call and turns its outcome into the response relayed to
//! the caller.

use axum::body::Body;
use axum::http::Response;
use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::Config,
    error::{ProxyError, ProxyResult},
    proxy::headers::{build_upstream_headers, relay_headers},
    proxy::target::UpstreamTarget,
    streaming::{ByteStream, RelayStream},
};

/// Client for the Gemini models endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// Forward a JSON body to `{base}/{model}:{action}?key={key}` and relay the result
    ///
    /// The body is sent as-is. Successful responses are streamed back chunk by
    /// chunk; non-success responses are read in full and wrapped.
    #[instrument(skip_all, fields(model = %target.model, action = %target.action))]
    pub async fn forward(
        &self,
        target: &UpstreamTarget,
        api_key: &str,
        body: Bytes,
    ) -> ProxyResult<Response<Body>> {
        let endpoint = target.endpoint(&self.base_url);
        debug!(endpoint = %endpoint, body_len = body.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", api_key)])
            .headers(build_upstream_headers())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let e = ProxyError::transport(e);
                error!(endpoint = %endpoint, error = %e, "Failed to reach Gemini");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(ProxyError::transport)?;
            warn!(endpoint = %endpoint, status = %status, "Gemini returned an error");
            return Err(ProxyError::Upstream { status, body: text });
        }

        info!(endpoint = %endpoint, status = %status, "Relaying Gemini response");
        relay_response(response, target)
    }
}

/// Convert a successful upstream response into a streamed client response
fn relay_response(
    response: reqwest::Response,
    target: &UpstreamTarget,
) -> ProxyResult<Response<Body>> {
    let streaming = target.action.is_streaming();

    let mut builder = Response::builder().status(response.status());
    if let Some(headers) = builder.headers_mut() {
        headers.extend(relay_headers(response.headers(), streaming));
    }

    let upstream: ByteStream = Box::pin(response.bytes_stream());
    let relay = RelayStream::new(upstream, target.model.clone(), target.action);

    builder
        .body(Body::from_stream(relay))
        .map_err(|e| ProxyError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
