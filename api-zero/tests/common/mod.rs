//! In-process axum server used by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use api_zero::ApiClient;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use serde_json::{Map, Value, json};

/// Size of the `/large` payload.
pub const LARGE_BODY: usize = 64 * 1024;

#[derive(Default)]
pub struct Hits {
    count: AtomicU32,
}

impl Hits {
    pub fn get(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

pub struct TestServer {
    pub base_url: String,
    pub hits: Arc<Hits>,
}

impl TestServer {
    pub async fn start() -> Self {
        init_tracing();

        let hits = Arc::new(Hits::default());
        let app = Router::new()
            .route("/users/{id}", get(user))
            .route("/echo", any(echo))
            .route("/text", get(|| async { "plain text" }))
            .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route("/error/json", get(error_json))
            .route("/error/text", get(error_text))
            .route("/slow", get(slow))
            .route("/fail", get(fail))
            .route("/large", get(large))
            .route("/upload", post(upload))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::builder(&self.base_url).build().unwrap()
    }
}

/// Base URL of a port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

async fn user(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({ "id": id, "name": "Ada" }))
}

/// Reflects the request back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or_default().to_owned();
            (name.as_str().to_owned(), Value::String(value))
        })
        .collect();
    let body = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": body,
    }))
}

async fn error_json() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "invalid", "field": "name" })),
    )
}

async fn error_text() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "slow": true }))
}

async fn fail(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.count.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "retry": true })))
}

async fn large() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![7u8; LARGE_BODY],
    )
}

async fn upload(body: Bytes) -> Json<Value> {
    Json(json!({ "received": body.len() }))
}
