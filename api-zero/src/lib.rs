//! Lightweight HTTP API client.
//!
//! This crate wraps a hyper-based transport in a request pipeline with
//! interceptors, request/response transforms, retries with backoff,
//! cancellation, progress reporting and response validation. Every failure
//! is reported as one typed [`ApiError`].
//!
//! ## Example
//!
//! ```ignore
//! use api_zero::{ApiClient, Json, RequestOptions, RetryPolicy};
//! use std::time::Duration;
//!
//! let client = ApiClient::builder("https://api.example.com")
//!     .timeout(Duration::from_secs(10))
//!     .retry(RetryPolicy::new().attempts(2).delay(Duration::from_millis(200)))
//!     .build()?;
//!
//! client.set_auth_token("secret")?;
//!
//! let users: Vec<User> = client
//!     .get("/users", RequestOptions::new().param("page", 1))
//!     .await?;
//!
//! let created: User = client
//!     .post("/users", Json(&new_user), RequestOptions::new())
//!     .await?;
//! ```
//!
//! ## Interceptors
//!
//! Each client owns a request-phase and a response-phase registry. Ids are
//! stable, so an interceptor can be ejected later:
//!
//! ```ignore
//! use api_zero::Interceptor;
//!
//! let id = client.interceptors().request.register(
//!     Interceptor::new().on_fulfilled(|mut config: RequestConfig| async move {
//!         config.headers.insert("x-trace-id", new_trace_id().parse().unwrap());
//!         Ok(config)
//!     }),
//! );
//!
//! // A rejected handler on the response side may recover a failure
//! client.interceptors().response.register(
//!     Interceptor::new().on_rejected(|err: ApiError| async move {
//!         if err.is_unauthorized() { refresh_and_retry().await } else { Err(err) }
//!     }),
//! );
//!
//! client.interceptors().request.eject(id);
//! ```
//!
//! ## Cancellation and Timeouts
//!
//! Every attempt races the caller's [`CancellationToken`] against the
//! configured timeout (30 seconds by default). The error tells the two apart:
//! [`ApiError::is_aborted`] for the caller's signal, [`ApiError::is_timeout`]
//! (status 408) for the deadline.
//!
//! ```ignore
//! let token = CancellationToken::new();
//! let options = RequestOptions::new()
//!     .signal(token.clone())
//!     .timeout(Duration::from_secs(5));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificates |
//! | `tracing` (default) | Spans per request and retry events |
//!
//! With `tracing` enabled each request runs in an `http.request` span
//! carrying `http.method`, `http.path`, `http.url`, `http.status` and
//! `otel.kind = "client"`.

mod builder;
mod client;
mod config;
mod options;
mod pipeline;
mod provider;
mod response;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder};
pub use client::{ApiClient, Interceptors};
pub use config::{
    ClientConfig, Logger, RequestTransform, ResponseTransform, request_transform,
    request_transform_async, response_transform, response_transform_async,
};
pub use options::RequestOptions;
pub use provider::{ApiProvider, try_use_api, use_api};
pub use response::Response;
pub use transport::{HyperTransport, HyperTransportBuilder};

// Re-export core types
pub use api_zero_core::{
    ApiError, ArrayFormat, Backoff, Blob, BoxError, CancellationToken, CredentialPolicy,
    DEFAULT_TIMEOUT, ErrorKind, Interceptor, InterceptorId, InterceptorManager, IntoRequestBody,
    Json, ParamValue, Params, Progress, RequestBody, RequestConfig, ResponseData, ResponseType,
    RetryPolicy, serialize_params,
};
