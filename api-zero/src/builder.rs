//! Client builder.
//!
//! Provides a fluent API for configuring and building an [`ApiClient`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use api_zero_core::{ApiError, ArrayFormat, CredentialPolicy, RequestBody, ResponseData, RetryPolicy};
use http::{HeaderName, HeaderValue};

use crate::client::ApiClient;
use crate::config::{
    ClientConfig, Logger, request_transform, request_transform_async, response_transform,
    response_transform_async,
};
use crate::transport::HyperTransport;

/// Builder for creating an [`ApiClient`].
///
/// # Example
///
/// ```ignore
/// use api_zero::{ApiClient, RetryPolicy};
/// use std::time::Duration;
///
/// let client = ApiClient::builder("https://api.example.com")
///     .timeout(Duration::from_secs(10))
///     .header("x-client", "dashboard")
///     .retry(RetryPolicy::new().attempts(2))
///     .build()?;
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    /// Pre-built transport; one is created at build time otherwise.
    transport: Option<HyperTransport>,
    /// TCP connect timeout for the transport created at build time.
    connect_timeout: Option<Duration>,
    /// First header that failed to parse, reported by `build`.
    invalid_header: Option<String>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("transport", &self.transport.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientBuilder {
    /// Create a builder for the given base URL.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self::from_config(ClientConfig::new(base_url))
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            connect_timeout: None,
            invalid_header: None,
        }
    }

    /// Default timeout for each attempt. Zero means the library default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header sent with every request.
    ///
    /// An invalid name or value makes [`build`](Self::build) fail.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        let parsed = name
            .try_into()
            .map_err(|e| format!("invalid header name: {e}"))
            .and_then(|name| {
                value
                    .try_into()
                    .map(|value| (name, value))
                    .map_err(|e| format!("invalid header value: {e}"))
            });
        match parsed {
            Ok((name, value)) => {
                self.config.headers.insert(name, value);
            }
            Err(message) if self.invalid_header.is_none() => {
                self.invalid_header = Some(message);
            }
            Err(_) => {}
        }
        self
    }

    pub fn credentials(mut self, policy: CredentialPolicy) -> Self {
        self.config.credentials = policy;
        self
    }

    /// Retry failed requests with `policy` unless a call overrides it.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    /// Append a synchronous request body transform.
    pub fn transform_request<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<RequestBody>) -> Option<RequestBody> + Send + Sync + 'static,
    {
        self.config.request_transforms.push(request_transform(f));
        self
    }

    /// Append an asynchronous, fallible request body transform.
    pub fn transform_request_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Option<RequestBody>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<RequestBody>, ApiError>> + Send + 'static,
    {
        self.config.request_transforms.push(request_transform_async(f));
        self
    }

    /// Append a synchronous response data transform.
    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseData) -> ResponseData + Send + Sync + 'static,
    {
        self.config.response_transforms.push(response_transform(f));
        self
    }

    /// Append an asynchronous, fallible response data transform.
    pub fn transform_response_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ResponseData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseData, ApiError>> + Send + 'static,
    {
        self.config.response_transforms.push(response_transform_async(f));
        self
    }

    pub fn params_array_format(mut self, format: ArrayFormat) -> Self {
        self.config.params_array_format = format;
        self
    }

    /// Emit request and response debug events.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.config.logger = logger;
        self
    }

    /// Use a pre-configured transport.
    ///
    /// This is how custom TLS settings reach the client.
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Bound TCP connection setup. Ignored when a transport is supplied.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient, ClientBuildError> {
        if let Some(message) = self.invalid_header {
            return Err(ClientBuildError::InvalidConfig(message));
        }
        self.config
            .validate()
            .map_err(|e| ClientBuildError::InvalidConfig(e.to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = HyperTransport::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(ApiClient::from_parts(transport, self.config))
    }
}

/// Error returned when building a client fails.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// No usable TLS configuration.
    #[error("failed to configure TLS: {0}")]
    Tls(String),
    /// The configuration contains a value that cannot work.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
