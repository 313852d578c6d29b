//! Streaming relay integration tests
//!
//! These run the proxy and a hand-written upstream on real sockets, since the
//! properties under test only show up over the wire:
//! - upstream chunks written separately reach the client separately
//! - a client disconnect closes the upstream stream

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use gemini_proxy::RouteVariant;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

use crate::common::{constants, pool_policy, spawn_app, test_config, test_router};

const CHUNK_GAP: Duration = Duration::from_millis(200);

/// Upstream writing "a", "b", "c" as three separate chunks with a pause between
fn chunked_upstream() -> Router {
    async fn handler() -> Response {
        let chunks = stream::iter(["a", "b", "c"]).enumerate().then(|(i, chunk)| async move {
            if i > 0 {
                tokio::time::sleep(CHUNK_GAP).await;
            }
            Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(chunks))
            .unwrap()
    }

    Router::new().route("/v1beta/models/:target", post(handler))
}

/// Fires when the upstream body is dropped
struct DropSignal(Option<oneshot::Sender<()>>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

type SignalSlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

/// Upstream producing an endless stream, signalling when the stream is dropped
fn endless_upstream(slot: SignalSlot) -> Router {
    async fn handler(State(slot): State<SignalSlot>) -> Response {
        let signal = DropSignal(slot.lock().unwrap().take());
        let ticks = stream::unfold((0u64, signal), |(n, signal)| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let chunk = Bytes::from(format!("{{\"tick\":{}}}\n", n));
            Some((Ok::<_, Infallible>(chunk), (n + 1, signal)))
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(ticks))
            .unwrap()
    }

    Router::new()
        .route("/v1beta/models/:target", post(handler))
        .with_state(slot)
}

async fn spawn_proxy(upstream: SocketAddr) -> SocketAddr {
    let base_url = format!("http://{}/v1beta/models", upstream);
    spawn_app(test_router(test_config(
        &base_url,
        pool_policy(),
        RouteVariant::Models,
    )))
    .await
}

async fn open_stream(proxy: SocketAddr) -> reqwest::Response {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build client")
        .post(format!(
            "http://{}/v1beta/models/streamGenerateContent",
            proxy
        ))
        .header(header::CONTENT_TYPE, "application/json")
        .body(constants::REQUEST_BODY)
        .send()
        .await
        .expect("proxy request failed")
}

#[tokio::test]
async fn test_chunks_are_delivered_incrementally() {
    let upstream = spawn_app(chunked_upstream()).await;
    let proxy = spawn_proxy(upstream).await;

    let response = open_stream(proxy).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache"
    );

    let started = Instant::now();
    let mut deliveries = Vec::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.expect("stream error");
        deliveries.push((String::from_utf8(chunk.to_vec()).unwrap(), started.elapsed()));
    }

    let chunks: Vec<&str> = deliveries.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(chunks, vec!["a", "b", "c"]);

    // The first chunk arrived well before the upstream wrote the last one
    let first_at = deliveries[0].1;
    let last_at = deliveries[2].1;
    assert!(
        last_at - first_at >= CHUNK_GAP,
        "chunks arrived together: first at {:?}, last at {:?}",
        first_at,
        last_at
    );
}

#[tokio::test]
async fn test_client_disconnect_closes_upstream() {
    let (tx, rx) = oneshot::channel();
    let slot: SignalSlot = Arc::new(Mutex::new(Some(tx)));

    let upstream = spawn_app(endless_upstream(slot)).await;
    let proxy = spawn_proxy(upstream).await;

    let response = open_stream(proxy).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let mut body = response.bytes_stream();
    let first = body.next().await.expect("no first chunk").expect("stream error");
    assert!(!first.is_empty());

    // Hang up mid-stream
    drop(body);

    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("upstream stream was not closed after the client went away")
        .expect("drop signal sender vanished");
}
