//! Forwarding handlers
//!
//! Validates the inbound request, resolves the upstream key and target, and
//! hands off to the Gemini client. Responses come back as-is (success) or as a
//! plain-text [`ProxyError`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{ProxyError, ProxyResult},
    middleware::cors::PREFLIGHT_MAX_AGE,
    proxy::{Action, RouteTarget, UpstreamTarget},
    AppState,
};

/// Query parameters understood by the forwarding routes
#[derive(Debug, Default, Deserialize)]
pub struct ForwardQuery {
    /// Caller-supplied key (pass-through policy only)
    pub key: Option<String>,
    /// `false` selects the non-streaming action on the root route
    pub stream: Option<String>,
}

impl ForwardQuery {
    /// Streaming unless `stream=false`
    pub fn is_streaming(&self) -> bool {
        self.stream.as_deref() != Some("false")
    }
}

/// `POST /v1beta/models/{target}`
pub async fn models_forward(
    State(state): State<Arc<AppState>>,
    Path(segment): Path<String>,
    Query(query): Query<ForwardQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ProxyResult<Response> {
    let target = RouteTarget::parse(&segment)
        .ok_or(ProxyError::NotFound)?
        .resolve(&state.config.model_name);

    forward(&state, target, query.key.as_deref(), &headers, body).await
}

/// `POST /`
pub async fn root_forward(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForwardQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ProxyResult<Response> {
    let target = UpstreamTarget {
        model: state.config.model_name.clone(),
        action: Action::from_streaming(query.is_streaming()),
    };

    forward(&state, target, query.key.as_deref(), &headers, body).await
}

/// `OPTIONS /v1beta/models/{target}`
pub async fn models_preflight(Path(segment): Path<String>) -> ProxyResult<Response> {
    RouteTarget::parse(&segment).ok_or(ProxyError::NotFound)?;
    Ok(preflight().await)
}

/// `OPTIONS` on any recognized route
pub async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    response
}

/// Fallback for unmatched paths and methods
pub async fn not_found() -> ProxyError {
    ProxyError::NotFound
}

async fn forward(
    state: &AppState,
    target: UpstreamTarget,
    query_key: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> ProxyResult<Response> {
    let body = validate_body(headers, body)?;
    let api_key = state.config.key_policy.resolve(query_key, headers)?;

    info!(
        model = %target.model,
        action = %target.action,
        key_policy = state.config.key_policy.name(),
        body_len = body.len(),
        "Forwarding request"
    );

    state.gemini.forward(&target, &api_key, body).await
}

/// Check the inbound body and content type, returning the bytes to forward
///
/// A JSON media type (parameters allowed) gets its body parsed first, so
/// malformed JSON is a 400 even before the strict content-type check; an empty
/// body stands in for `{}`, and only an object or array is accepted at the top
/// level. Only an exact `application/json` passes the content-type check.
pub fn validate_body(headers: &HeaderMap, body: Bytes) -> ProxyResult<Bytes> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let body = if content_type.is_some_and(is_json_media_type) {
        if body.is_empty() {
            Bytes::from_static(b"{}")
        } else {
            let value = serde_json::from_slice::<serde_json::Value>(&body)
                .map_err(|e| ProxyError::InvalidJson(e.to_string()))?;
            if !(value.is_object() || value.is_array()) {
                return Err(ProxyError::InvalidJson(
                    "Request body must be a JSON object or array".to_string(),
                ));
            }
            body
        }
    } else {
        body
    };

    if content_type != Some("application/json") {
        debug!(content_type = ?content_type, "Rejecting unsupported content type");
        return Err(ProxyError::UnsupportedMediaType);
    }

    Ok(body)
}

fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
