//! In-process backend used by the HTTP integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use futures::StreamExt;
use repolens::api::ApiClient;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

/// An SSE response that delivers each chunk separately, with a short pause
/// between chunks so they reach the client as distinct reads.
pub fn sse(chunks: Vec<Vec<u8>>) -> Response {
    let stream = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    });
    sse_body(Body::from_stream(stream))
}

/// An SSE response that sends `first` and then never finishes.
pub fn sse_then_hang(first: &str) -> Response {
    let first = Bytes::from(first.to_string());
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(first) })
        .chain(futures::stream::pending());
    sse_body(Body::from_stream(stream))
}

/// An SSE response that sends `first` and then aborts the connection.
pub fn sse_then_break(first: &str) -> Response {
    let first = Bytes::from(first.to_string());
    let stream = futures::stream::iter(vec![
        Ok(first),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend crashed")),
    ])
    .then(|item| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        item
    });
    sse_body(Body::from_stream(stream))
}

fn sse_body(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

/// `data: <payload>\n\n`
pub fn record(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}

pub fn token(fragment: &str) -> String {
    record(&serde_json::json!({ "type": "token", "data": fragment }).to_string())
}

pub fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
