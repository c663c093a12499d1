//! HTTP transport layer.
//!
//! Requests are sent through one of two interchangeable [`Strategy`] values:
//!
//! - [`Strategy::Fetch`] (default) sends the body in a single frame and
//!   buffers the response
//! - [`Strategy::Progress`] is selected when upload progress is requested; it
//!   streams the body in chunks and reads the response frame by frame,
//!   reporting both directions to the caller's callbacks
//!
//! Both go through [`HyperTransport`] and produce the same
//! `Result<Response, ApiError>` contract, so the pipeline never branches on
//! which one ran.
//!
//! # Feature Flags
//!
//! TLS support requires enabling the appropriate features:
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod decode;
mod fetch;
mod hyper;
mod progress;

use std::future::Future;

use api_zero_core::{ApiError, CancellationToken, CredentialPolicy, RequestBody, RequestConfig};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{HeaderValue, Uri};

pub use body::{TransportBody, UPLOAD_CHUNK_SIZE};
pub use connector::{client_tls_config, https_connector, tcp_connector, tls_available};
pub use self::hyper::{HyperTransport, HyperTransportBuilder};

use crate::Response;

/// How a single attempt is put on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Fetch,
    Progress,
}

impl Strategy {
    /// Pick the strategy for a request: progress whenever the caller asked
    /// for upload progress, fetch otherwise.
    pub fn select(config: &RequestConfig) -> Self {
        if config.tracks_upload_progress() {
            Strategy::Progress
        } else {
            Strategy::Fetch
        }
    }

    /// Perform one attempt.
    pub async fn send(
        self,
        transport: &HyperTransport,
        config: &RequestConfig,
    ) -> Result<Response, ApiError> {
        match self {
            Strategy::Fetch => fetch::send(transport, config).await,
            Strategy::Progress => progress::send(transport, config).await,
        }
    }
}

/// Race `attempt` against the caller's signal and the request timeout.
///
/// The caller's signal is polled first, so if both it and the deadline are
/// ready on the same wakeup the request reports as aborted. Completing (or
/// aborting) drops the timer.
pub(crate) async fn with_deadline<F, T>(config: &RequestConfig, attempt: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let signal = config.signal.clone().unwrap_or_else(CancellationToken::new);
    let timeout = config.effective_timeout();

    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(ApiError::aborted()),
        _ = tokio::time::sleep(timeout) => Err(ApiError::timeout()),
        result = attempt => result,
    }
}

/// Build the request head and encode the body.
///
/// The content type implied by the body is applied only when the caller
/// has not set one. Cookies are stripped according to the credential
/// policy; an explicit `Authorization` header is always sent.
pub(crate) fn prepare_request(
    config: &RequestConfig,
) -> Result<(http::Request<()>, Option<Bytes>), ApiError> {
    let uri: Uri = config
        .url
        .parse()
        .map_err(|e| ApiError::request(format!("invalid URL `{}`: {e}", config.url)))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ApiError::request(format!(
            "URL `{}` is not absolute; configure a base URL",
            config.url
        )));
    }

    let mut headers = config.headers.clone();
    if !sends_cookies(config, &uri) {
        headers.remove(COOKIE);
    }

    let encoded = config.body.as_ref().map(RequestBody::encode).transpose()?;
    let default_content_type = encoded
        .as_ref()
        .and_then(|e| e.default_content_type.as_deref());
    if let Some(content_type) = default_content_type.filter(|_| !headers.contains_key(CONTENT_TYPE)) {
        let value = HeaderValue::from_str(content_type)
            .map_err(|e| ApiError::request(format!("invalid content type: {e}")))?;
        headers.insert(CONTENT_TYPE, value);
    }

    let mut request = http::Request::new(());
    *request.method_mut() = config.method.clone();
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;

    Ok((request, encoded.map(|e| e.bytes)))
}

fn sends_cookies(config: &RequestConfig, uri: &Uri) -> bool {
    match config.credentials {
        CredentialPolicy::Include => true,
        CredentialPolicy::Omit => false,
        CredentialPolicy::SameOrigin => match config.base_url.parse::<Uri>() {
            Ok(base) if base.authority().is_some() => {
                base.scheme() == uri.scheme() && base.authority() == uri.authority()
            }
            // Without an absolute base there is no origin to compare against
            _ => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_zero_core::{Blob, Progress};
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(url: &str) -> RequestConfig {
        let mut config = RequestConfig::new(Method::POST, "/items");
        config.base_url = "http://api.local".into();
        config.url = url.into();
        config
    }

    #[test]
    fn test_strategy_selection() {
        let mut config = config("http://api.local/items");
        assert_eq!(Strategy::select(&config), Strategy::Fetch);

        // Download progress alone does not switch strategies
        config.on_download_progress = Some(Arc::new(|_: Progress| {}));
        assert_eq!(Strategy::select(&config), Strategy::Fetch);

        config.on_upload_progress = Some(Arc::new(|_: Progress| {}));
        assert_eq!(Strategy::select(&config), Strategy::Progress);
    }

    #[test]
    fn test_json_body_sets_default_content_type() {
        let mut config = config("http://api.local/items");
        config.body = Some(RequestBody::Json(json!({"a": 1})));
        let (request, body) = prepare_request(&config).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body.unwrap().as_ref(), br#"{"a":1}"#);
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let mut config = config("http://api.local/items");
        config
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        config.body = Some(RequestBody::Json(json!([])));
        let (request, _) = prepare_request(&config).unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn test_binary_bodies_pass_through() {
        let mut config = config("http://api.local/items");
        config.body = Some(RequestBody::Bytes(Bytes::from_static(b"raw")));
        let (request, body) = prepare_request(&config).unwrap();
        assert!(request.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body.unwrap().as_ref(), b"raw");

        config.body = Some(RequestBody::Blob(
            Blob::new(Bytes::from_static(b"png")).with_content_type("image/png"),
        ));
        let (request, _) = prepare_request(&config).unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "image/png");
    }

    #[test]
    fn test_no_body_no_content_type() {
        let config = config("http://api.local/items");
        let (request, body) = prepare_request(&config).unwrap();
        assert!(body.is_none());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_relative_url_is_request_error() {
        let config = config("/items");
        let err = prepare_request(&config).unwrap_err();
        assert_eq!(err.kind(), api_zero_core::ErrorKind::Request);
    }

    #[test]
    fn test_credentials_policy_governs_cookies_only() {
        let mut config = config("http://api.local/items");
        config
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        config.headers.insert(COOKIE, HeaderValue::from_static("s=1"));

        let (request, _) = prepare_request(&config).unwrap();
        assert!(request.headers().contains_key(COOKIE));

        config.url = "http://elsewhere.local/items".into();
        let (request, _) = prepare_request(&config).unwrap();
        assert!(!request.headers().contains_key(COOKIE));
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t");

        config.credentials = CredentialPolicy::Include;
        let (request, _) = prepare_request(&config).unwrap();
        assert!(request.headers().contains_key(COOKIE));

        config.url = "http://api.local/items".into();
        config.credentials = CredentialPolicy::Omit;
        let (request, _) = prepare_request(&config).unwrap();
        assert!(!request.headers().contains_key(COOKIE));
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_timeout() {
        let mut config = config("http://api.local/items");
        config.timeout = Duration::from_millis(100);
        let result: Result<(), ApiError> =
            with_deadline(&config, std::future::pending()).await;
        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.is_aborted());
        assert_eq!(err.status(), 408);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_reports_aborted() {
        let mut config = config("http://api.local/items");
        config.timeout = Duration::from_millis(5000);
        let token = CancellationToken::new();
        config.signal = Some(token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel();
        });

        let result: Result<(), ApiError> =
            with_deadline(&config, std::future::pending()).await;
        let err = result.unwrap_err();
        assert!(err.is_aborted());
        assert!(!err.is_timeout());
        assert_eq!(err.status(), 0);
    }

    #[tokio::test]
    async fn test_completed_attempt_passes_through() {
        let config = config("http://api.local/items");
        let result = with_deadline(&config, async { Ok::<_, ApiError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
