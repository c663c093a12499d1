//! Per-call options.
//!
//! [`RequestOptions`] carries the settings for a single call. Anything left
//! unset falls back to the client's [`ClientConfig`](crate::ClientConfig);
//! headers merge key by key with the client defaults.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use api_zero_core::{
    ArrayFormat, BoxError, BoxFuture, CancellationToken, CredentialPolicy, ParamValue, Params,
    Progress, ProgressCallback, ResponseData, ResponseType, RetryPolicy, ValidateResponse,
    ValidationErrorHook, ApiError,
};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Options for configuring an individual request.
///
/// # Example
///
/// ```ignore
/// use api_zero::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::new()
///     .timeout(Duration::from_secs(5))
///     .param("page", 2)
///     .header("x-request-id", "abc-123");
///
/// let users: Vec<User> = client.get("/users", options).await?;
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub(crate) params: Params,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
    pub(crate) signal: Option<CancellationToken>,
    pub(crate) base_url: Option<String>,
    pub(crate) credentials: Option<CredentialPolicy>,
    /// Outer `None` inherits the client policy; `Some(None)` disables retries.
    pub(crate) retry: Option<Option<RetryPolicy>>,
    pub(crate) response_type: Option<ResponseType>,
    pub(crate) params_array_format: Option<ArrayFormat>,
    pub(crate) on_upload_progress: Option<ProgressCallback>,
    pub(crate) on_download_progress: Option<ProgressCallback>,
    pub(crate) validate_response: Option<ValidateResponse>,
    pub(crate) on_validation_error: Option<ValidationErrorHook>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the client timeout for this call.
    ///
    /// The timeout applies to each attempt separately and covers reading the
    /// response body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Cancel the request when `signal` fires.
    ///
    /// A cancelled request fails with an aborted error and is never retried.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Send this call to a different base address.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn credentials(mut self, policy: CredentialPolicy) -> Self {
        self.credentials = Some(policy);
        self
    }

    /// Add a header for this call.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Try to add a header for this call.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Set all headers for this call, replacing any added earlier.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Add one query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Replace the query parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn params_array_format(mut self, format: ArrayFormat) -> Self {
        self.params_array_format = Some(format);
        self
    }

    /// Use `policy` instead of the client's retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(Some(policy));
        self
    }

    /// Disable retries for this call even if the client has a policy.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(None);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Report cumulative upload progress.
    ///
    /// Requesting upload progress switches the call to the progress
    /// transport, which also reports download progress.
    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    /// Report cumulative download progress.
    pub fn on_download_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(f));
        self
    }

    /// Accept a successful response only if `f` returns `true`.
    pub fn validate_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResponseData) -> bool + Send + Sync + 'static,
    {
        self.validate_response = Some(Arc::new(
            move |data: ResponseData| -> BoxFuture<'static, Result<bool, BoxError>> {
                let valid = f(&data);
                Box::pin(async move { Ok(valid) })
            },
        ));
        self
    }

    /// Asynchronous form of [`validate_response`](Self::validate_response).
    ///
    /// An `Err` from the validator fails the call the same way `false` does,
    /// with the validator's message.
    pub fn validate_response_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ResponseData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
    {
        self.validate_response = Some(Arc::new(
            move |data: ResponseData| -> BoxFuture<'static, Result<bool, BoxError>> {
                Box::pin(f(data))
            },
        ));
        self
    }

    /// Called once with the validation error before it is returned.
    pub fn on_validation_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_validation_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal.is_some())
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .field("response_type", &self.response_type)
            .field("params_array_format", &self.params_array_format)
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("validate_response", &self.validate_response.is_some())
            .field("on_validation_error", &self.on_validation_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_options() {
        let options = RequestOptions::new();
        assert!(options.get_timeout().is_none());
        assert!(options.headers.is_empty());
        assert!(options.params.is_empty());
        assert!(options.retry.is_none());
    }

    #[test]
    fn test_header() {
        let options = RequestOptions::new()
            .header("x-custom", "value")
            .header("x-other", "other");
        assert_eq!(options.headers.get("x-custom").unwrap(), "value");
        assert_eq!(options.headers.len(), 2);
    }

    #[test]
    fn test_try_header_rejects_invalid() {
        assert!(RequestOptions::new().try_header("x-ok", "v").is_some());
        assert!(RequestOptions::new().try_header("bad header", "v").is_none());
        assert!(RequestOptions::new().try_header("x-bad", "a\nb").is_none());
    }

    #[test]
    #[should_panic(expected = "invalid header name")]
    fn test_header_panics_on_invalid_name() {
        let _ = RequestOptions::new().header("bad header", "v");
    }

    #[test]
    fn test_retry_override_states() {
        assert!(matches!(RequestOptions::new().no_retry().retry, Some(None)));
        let options = RequestOptions::new().retry(RetryPolicy::new().attempts(5));
        assert!(matches!(options.retry, Some(Some(ref p)) if p.attempts == 5));
    }

    #[test]
    fn test_params() {
        let options = RequestOptions::new()
            .param("page", 2)
            .param("tags", vec!["a", "b"])
            .param("page", 3);
        assert_eq!(options.params.len(), 2);
        assert_eq!(options.params.get("page"), Some(&ParamValue::from(3)));
    }

    #[tokio::test]
    async fn test_sync_validator_is_wrapped() {
        let options = RequestOptions::new()
            .validate_response(|data| data.as_json().is_some_and(|v| v["ok"] == true));
        let validate = options.validate_response.unwrap();
        assert!(validate(json!({"ok": true}).into()).await.unwrap());
        assert!(!validate(json!({"ok": false}).into()).await.unwrap());
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let options = RequestOptions::new().on_download_progress(|_| {});
        let debug = format!("{options:?}");
        assert!(debug.contains("on_download_progress: true"));
        assert!(debug.contains("on_upload_progress: false"));
    }
}
