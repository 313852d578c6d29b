//! HTTP routes for the Gemini proxy
//!
//! This module defines all HTTP endpoints exposed by the proxy.

pub mod forward;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{post, MethodRouter},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info_span, Span};

use crate::{config::RouteVariant, middleware::cors::cors_middleware, AppState};

/// Largest request body accepted for forwarding (Gemini's inline-data ceiling)
pub const MAX_REQUEST_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = match state.config.route_variant {
        RouteVariant::Models => Router::new().route(
            "/v1beta/models/:target",
            forwarding(post(forward::models_forward).options(forward::models_preflight)),
        ),
        RouteVariant::Root => Router::new().route(
            "/",
            forwarding(post(forward::root_forward).options(forward::preflight)),
        ),
    };

    routes
        .fallback(forward::not_found)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        // Global middleware (applied to all routes, fallback included)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

/// Request span carrying the method and path only
///
/// The query string is left out: in pass-through mode it holds the caller's key.
fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Unknown methods on a known path are a plain 404, not a 405
fn forwarding(router: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    router.fallback(forward::not_found)
}
