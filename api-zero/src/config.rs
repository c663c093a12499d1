//! Client-level configuration.
//!
//! [`ClientConfig`] holds the defaults every request starts from. It is owned
//! by one [`ApiClient`](crate::ApiClient) and may be changed at runtime; each
//! request snapshots it when it starts, so in-flight requests never observe a
//! later change.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use api_zero_core::{
    ApiError, ArrayFormat, BoxFuture, CredentialPolicy, DEFAULT_TIMEOUT, RequestBody,
    RequestConfig, ResponseData, RetryPolicy,
};
use http::HeaderMap;

use crate::Response;

/// Rewrites the request body before any interceptor sees it.
pub type RequestTransform = Arc<
    dyn Fn(Option<RequestBody>) -> BoxFuture<'static, Result<Option<RequestBody>, ApiError>>
        + Send
        + Sync,
>;

/// Rewrites decoded response data after the response interceptors ran.
pub type ResponseTransform =
    Arc<dyn Fn(ResponseData) -> BoxFuture<'static, Result<ResponseData, ApiError>> + Send + Sync>;

/// Wrap a synchronous request transform.
pub fn request_transform<F>(f: F) -> RequestTransform
where
    F: Fn(Option<RequestBody>) -> Option<RequestBody> + Send + Sync + 'static,
{
    Arc::new(move |body| -> BoxFuture<'static, Result<Option<RequestBody>, ApiError>> {
        let body = f(body);
        Box::pin(async move { Ok(body) })
    })
}

/// Wrap an asynchronous, fallible request transform.
pub fn request_transform_async<F, Fut>(f: F) -> RequestTransform
where
    F: Fn(Option<RequestBody>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<RequestBody>, ApiError>> + Send + 'static,
{
    Arc::new(move |body| -> BoxFuture<'static, Result<Option<RequestBody>, ApiError>> {
        Box::pin(f(body))
    })
}

/// Wrap a synchronous response transform.
pub fn response_transform<F>(f: F) -> ResponseTransform
where
    F: Fn(ResponseData) -> ResponseData + Send + Sync + 'static,
{
    Arc::new(move |data| -> BoxFuture<'static, Result<ResponseData, ApiError>> {
        let data = f(data);
        Box::pin(async move { Ok(data) })
    })
}

/// Wrap an asynchronous, fallible response transform.
pub fn response_transform_async<F, Fut>(f: F) -> ResponseTransform
where
    F: Fn(ResponseData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseData, ApiError>> + Send + 'static,
{
    Arc::new(move |data| -> BoxFuture<'static, Result<ResponseData, ApiError>> {
        Box::pin(f(data))
    })
}

/// Observation hooks invoked by the request pipeline.
///
/// `on_request` sees the config after the request interceptors ran,
/// `on_response` sees the response after the response interceptors ran, and
/// `on_error` sees every error a call returns.
#[derive(Clone, Default)]
pub struct Logger {
    pub on_request: Option<Arc<dyn Fn(&RequestConfig) + Send + Sync>>,
    pub on_response: Option<Arc<dyn Fn(&Response) + Send + Sync>>,
    pub on_error: Option<Arc<dyn Fn(&ApiError) + Send + Sync>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestConfig) + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(f));
        self
    }

    pub fn response<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(f));
        self
    }

    pub fn error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Default configuration shared by every request a client makes.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-attempt timeout. Zero means [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
    pub headers: HeaderMap,
    pub credentials: CredentialPolicy,
    /// `None` disables retries.
    pub retry: Option<RetryPolicy>,
    /// Applied in order to every request body.
    pub request_transforms: Vec<RequestTransform>,
    /// Applied in order to every successful response's data.
    pub response_transforms: Vec<ResponseTransform>,
    pub params_array_format: ArrayFormat,
    /// Emit request/response debug events (requires the `tracing` feature).
    pub debug: bool,
    pub logger: Logger,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            credentials: CredentialPolicy::default(),
            retry: None,
            request_transforms: Vec::new(),
            response_transforms: Vec::new(),
            params_array_format: ArrayFormat::default(),
            debug: false,
            logger: Logger::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.retry {
            Some(policy) => policy.validate(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .field("request_transforms", &self.request_transforms.len())
            .field("response_transforms", &self.response_transforms.len())
            .field("params_array_format", &self.params_array_format)
            .field("debug", &self.debug)
            .field("logger", &self.logger)
            .finish()
    }
}
