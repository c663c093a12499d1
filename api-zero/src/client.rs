//! API client implementation.
//!
//! This module provides the main [`ApiClient`] type: typed verb methods over
//! the request pipeline, runtime configuration changes, auth helpers, and the
//! two interceptor registries.

use std::sync::{Arc, PoisonError, RwLock};

use api_zero_core::{ApiError, InterceptorManager, IntoRequestBody, RequestBody, RequestConfig};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, AsHeaderName};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;

use crate::builder::{ClientBuildError, ClientBuilder};
use crate::config::ClientConfig;
use crate::options::RequestOptions;
use crate::pipeline;
use crate::response::Response;
use crate::transport::HyperTransport;

/// Request- and response-phase interceptor registries of one client.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Runs over the merged [`RequestConfig`] before the URL is built.
    pub request: InterceptorManager<RequestConfig>,
    /// Runs over the transport outcome before response transforms.
    pub response: InterceptorManager<Response>,
}

#[derive(Debug)]
struct Inner {
    transport: HyperTransport,
    config: RwLock<ClientConfig>,
    interceptors: Interceptors,
}

/// HTTP API client.
///
/// Cloning is cheap and every clone shares the same configuration and
/// interceptors. Each request snapshots the configuration when it starts, so
/// changes made with [`set_config`](Self::set_config) or the header helpers
/// only affect requests started afterwards.
///
/// # Example
///
/// ```ignore
/// use api_zero::{ApiClient, Json, RequestOptions};
///
/// let client = ApiClient::builder("https://api.example.com").build()?;
/// client.set_auth_token("secret")?;
///
/// let user: User = client.get("/users/1", RequestOptions::new()).await?;
/// let created: User = client
///     .post("/users", Json(&new_user), RequestOptions::new())
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Create a client from a full configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientBuildError> {
        ClientBuilder::from_config(config).build()
    }

    /// Create a new [`ClientBuilder`] with the given base URL.
    pub fn builder<S: Into<String>>(base_url: S) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Called by [`ClientBuilder::build`].
    pub(crate) fn from_parts(transport: HyperTransport, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config: RwLock::new(config),
                interceptors: Interceptors::default(),
            }),
        }
    }

    pub fn transport(&self) -> &HyperTransport {
        &self.inner.transport
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Snapshot of the current default configuration.
    pub fn config(&self) -> ClientConfig {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the default configuration in place.
    ///
    /// # Example
    ///
    /// ```ignore
    /// client.set_config(|config| {
    ///     config.timeout = Duration::from_secs(5);
    ///     config.debug = true;
    /// });
    /// ```
    pub fn set_config<F>(&self, f: F)
    where
        F: FnOnce(&mut ClientConfig),
    {
        let mut config = self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    /// Set a default header, replacing any existing values for `name`.
    pub fn set_header<K, V>(&self, name: K, value: V) -> Result<(), ApiError>
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Display,
    {
        let name = name
            .try_into()
            .map_err(|e| ApiError::request(format!("invalid header name: {e}")))?;
        let value = value
            .try_into()
            .map_err(|e| ApiError::request(format!("invalid header value: {e}")))?;
        self.set_config(|config| {
            config.headers.insert(name, value);
        });
        Ok(())
    }

    pub fn remove_header<K: AsHeaderName>(&self, name: K) {
        self.set_config(|config| {
            config.headers.remove(name);
        });
    }

    /// Merge `headers` into the defaults key by key.
    ///
    /// Every name present in `headers` has its previous values replaced;
    /// other default headers are left alone.
    pub fn update_headers(&self, headers: HeaderMap) {
        self.set_config(|config| merge_headers(&mut config.headers, &headers));
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn set_auth_token(&self, token: &str) -> Result<(), ApiError> {
        self.set_authorization(format!("Bearer {token}"))
    }

    /// Send `Authorization: Basic <base64(username:password)>` with every request.
    pub fn set_basic_auth(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.set_authorization(format!("Basic {encoded}"))
    }

    /// Stop sending the `Authorization` header.
    pub fn clear_auth(&self) {
        self.remove_header(AUTHORIZATION);
    }

    fn set_authorization(&self, credentials: String) -> Result<(), ApiError> {
        let mut value = HeaderValue::try_from(credentials)
            .map_err(|e| ApiError::request(format!("invalid authorization header: {e}")))?;
        value.set_sensitive(true);
        self.set_config(|config| {
            config.headers.insert(AUTHORIZATION, value);
        });
        Ok(())
    }

    /// Run a request through the full pipeline and return the response.
    ///
    /// This is the primitive the verb methods are built on.
    pub async fn request<B: IntoRequestBody>(
        &self,
        method: Method,
        path: &str,
        body: B,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        let body = body.into_request_body()?;
        pipeline::execute(self, method, path, body, options, Ok).await
    }

    /// Like [`request`](Self::request), deserializing the final data into
    /// `T` as the last pipeline stage.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        pipeline::execute(self, method, path, body, options, |response| {
            response.json()
        })
        .await
    }

    /// `GET path` and deserialize the response data.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request_json(Method::GET, path, None, options).await
    }

    /// `POST path` with `body` and deserialize the response data.
    pub async fn post<T: DeserializeOwned, B: IntoRequestBody>(
        &self,
        path: &str,
        body: B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = body.into_request_body()?;
        self.request_json(Method::POST, path, body, options).await
    }

    pub async fn put<T: DeserializeOwned, B: IntoRequestBody>(
        &self,
        path: &str,
        body: B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = body.into_request_body()?;
        self.request_json(Method::PUT, path, body, options).await
    }

    pub async fn patch<T: DeserializeOwned, B: IntoRequestBody>(
        &self,
        path: &str,
        body: B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let body = body.into_request_body()?;
        self.request_json(Method::PATCH, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request_json(Method::DELETE, path, None, options).await
    }
}

/// Replace the values of every name in `overrides`, keeping all of its
/// values for that name.
pub(crate) fn merge_headers(base: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        base.remove(name);
    }
    for (name, value) in overrides {
        base.append(name.clone(), value.clone());
    }
}
