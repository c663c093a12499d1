//! The hyper client every strategy sends through.

use std::error::Error as _;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use api_zero_core::ApiError;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{self, Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower_service::Service;

use super::body::TransportBody;
use super::connector::{client_tls_config, https_connector, tcp_connector};
use crate::ClientBuildError;

type Pooled = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// Pooled HTTP/1.1 client with rustls for `https://` URLs.
///
/// Cloning shares the connection pool.
///
/// ```ignore
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .build()?;
/// let client = ApiClient::builder("https://api.example.com")
///     .transport(transport)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    pool: Pooled,
    connect_timeout: Option<Duration>,
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// A transport using the TLS defaults of the enabled features.
    pub fn new() -> Result<Self, ClientBuildError> {
        HyperTransportBuilder::default().build()
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Send `request` and wait for the response head.
    ///
    /// Anything that prevents a response from arriving is a network error.
    pub async fn request(
        &self,
        request: http::Request<TransportBody>,
    ) -> Result<http::Response<Incoming>, ApiError> {
        self.pool.request(request).await.map_err(describe)
    }
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Flatten the error's source chain into one message, since the top-level
/// legacy client error alone only says "client error (Connect)".
fn describe(err: legacy::Error) -> ApiError {
    let mut message = format!("request failed: {err}");
    let mut cause = err.source();
    while let Some(inner) = cause {
        message = format!("{message}: {inner}");
        cause = inner.source();
    }
    ApiError::network(message)
}

/// Configures a [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    tls: Option<ClientConfig>,
    connect_timeout: Option<Duration>,
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default TLS setup, e.g. to pin private roots or present
    /// a client certificate.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls = Some(config);
        self
    }

    /// Limit TCP connection setup. Independent of the per-request timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Fails only when no TLS configuration was given and the enabled
    /// features cannot produce one.
    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let tls = self.tls.or_else(client_tls_config).ok_or_else(|| {
            ClientBuildError::Tls(
                "no TLS configuration: enable `tls`, pair a crypto provider feature with a \
                 root certificate feature, install a global rustls provider, or pass one \
                 through `tls_config`"
                    .to_owned(),
            )
        })?;

        let pool = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .build(https_connector(tls, tcp_connector(self.connect_timeout)));

        Ok(HyperTransport {
            pool,
            connect_timeout: self.connect_timeout,
        })
    }
}

impl fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("custom_tls", &self.tls.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Lets the transport sit under tower middleware.
impl Service<http::Request<TransportBody>> for HyperTransport {
    type Response = http::Response<Incoming>;
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, ApiError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), ApiError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<TransportBody>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.request(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_without_overrides() {
        let builder = HyperTransportBuilder::new();
        assert!(builder.tls.is_none());
        assert!(builder.connect_timeout.is_none());

        let builder = builder.connect_timeout(Duration::from_secs(3));
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn built_transport_keeps_connect_timeout() {
        let transport = HyperTransport::builder()
            .connect_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(transport.connect_timeout(), Some(Duration::from_secs(1)));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::new().unwrap();
        let request = http::Request::get(format!("http://{addr}/"))
            .body(TransportBody::empty())
            .unwrap();
        let err = transport.request(request).await.unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(err.status(), 0);
        assert!(err.message().starts_with("request failed"));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn service_is_always_ready() {
        let mut transport = HyperTransport::new().unwrap();
        std::future::poll_fn(|cx| {
            Service::<http::Request<TransportBody>>::poll_ready(&mut transport, cx)
        })
        .await
        .unwrap();
    }
}
