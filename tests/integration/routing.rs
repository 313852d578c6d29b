//! Routing integration tests
//!
//! Tests for route matching independent of the upstream:
//! - OPTIONS preflight on recognized routes
//! - 404 for unknown paths and methods
//! - CORS headers on every response

use axum::http::{header, Method, StatusCode};
use axum_test::{TestResponse, TestServer};
use gemini_proxy::RouteVariant;
use pretty_assertions::assert_eq;

use crate::common::{closed_port_url, pool_policy, test_config, test_server};

const MODEL_ROUTES: &[&str] = &[
    "/v1beta/models/generateContent",
    "/v1beta/models/streamGenerateContent",
    "/v1beta/models/custom-model:generateContent",
    "/v1beta/models/custom-model:streamGenerateContent",
];

async fn models_server() -> TestServer {
    test_server(test_config(
        &closed_port_url().await,
        pool_policy(),
        RouteVariant::Models,
    ))
}

async fn root_server() -> TestServer {
    test_server(test_config(
        &closed_port_url().await,
        pool_policy(),
        RouteVariant::Root,
    ))
}

fn assert_cors_headers(response: &TestResponse) {
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "GET, HEAD, POST, OPTIONS"
    );
    let allowed = headers
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(allowed.contains("Content-Type"));
    assert!(allowed.contains("Authorization"));
}

#[tokio::test]
async fn test_preflight_on_every_model_route() {
    let server = models_server().await;

    for route in MODEL_ROUTES {
        let response = server
            .method(Method::OPTIONS, route)
            .text("this body is ignored")
            .await;

        assert_eq!(response.status_code(), StatusCode::NO_CONTENT, "route {}", route);
        assert!(response.text().is_empty());
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
            "1728000"
        );
        assert_cors_headers(&response);
    }
}

#[tokio::test]
async fn test_preflight_on_root_route() {
    let server = root_server().await;

    let response = server.method(Method::OPTIONS, "/").await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(response.text().is_empty());
    assert_cors_headers(&response);
}

#[tokio::test]
async fn test_unknown_path_returns_not_found() {
    let server = models_server().await;

    let response = server.get("/foo").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Not found");
    assert_cors_headers(&response);
}

#[tokio::test]
async fn test_unknown_model_action_returns_not_found() {
    let server = models_server().await;

    let response = server
        .post("/v1beta/models/gemini-pro:countTokens")
        .content_type("application/json")
        .bytes("{}".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Not found");

    let response = server
        .method(Method::OPTIONS, "/v1beta/models/gemini-pro:countTokens")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_cors_headers(&response);
}

#[tokio::test]
async fn test_other_methods_on_known_route_return_not_found() {
    let server = models_server().await;

    let response = server.get("/v1beta/models/generateContent").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Not found");

    let response = server.put("/v1beta/models/generateContent").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_route_variants_are_exclusive() {
    let server = root_server().await;
    let response = server
        .post("/v1beta/models/generateContent")
        .content_type("application/json")
        .bytes("{}".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let server = models_server().await;
    let response = server
        .post("/")
        .content_type("application/json")
        .bytes("{}".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
