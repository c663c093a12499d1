//! Effective per-request configuration.
//!
//! A [`RequestConfig`] is the fully merged configuration for one call. It is
//! built once at the start of the pipeline, handed to request interceptors,
//! and frozen behind an `Arc` before dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method};
use tokio_util::sync::CancellationToken;

use crate::{ApiError, ArrayFormat, BoxFuture, Params, RequestBody, ResponseData, ResponseType, RetryPolicy};

/// Timeout applied when none (or zero) is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Boxed error returned by async validators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Receives cumulative transfer progress.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Decides whether a decoded response is acceptable.
pub type ValidateResponse =
    Arc<dyn Fn(ResponseData) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync>;

/// Notified once when validation rejects a response.
pub type ValidationErrorHook = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Cumulative bytes transferred so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    /// Total size when known up front.
    pub total: Option<u64>,
}

impl Progress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// `loaded / total`, when the total is known and non-zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64),
            _ => None,
        }
    }
}

/// Whether ambient credentials (the `Cookie` header) accompany a request.
///
/// An `Authorization` header set explicitly, e.g. by the auth helpers, is
/// sent under every policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Never send cookies.
    Omit,
    /// Send cookies only to the configured base address's origin.
    #[default]
    SameOrigin,
    /// Always send cookies.
    Include,
}

/// Fully merged configuration for a single request.
#[derive(Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub base_url: String,
    pub path: String,
    /// Final URL, filled in once the pipeline has built it.
    pub url: String,
    pub params: Params,
    pub params_array_format: ArrayFormat,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    /// Per-attempt deadline. Zero means [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
    pub credentials: CredentialPolicy,
    /// Caller-owned cancellation signal.
    pub signal: Option<CancellationToken>,
    /// `None` disables retries.
    pub retry: Option<RetryPolicy>,
    pub response_type: ResponseType,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
    pub validate_response: Option<ValidateResponse>,
    pub on_validation_error: Option<ValidationErrorHook>,
}

impl RequestConfig {
    /// A config with library defaults for `method` and `path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: String::new(),
            path: path.into(),
            url: String::new(),
            params: Params::new(),
            params_array_format: ArrayFormat::default(),
            headers: HeaderMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            credentials: CredentialPolicy::default(),
            signal: None,
            retry: None,
            response_type: ResponseType::default(),
            on_upload_progress: None,
            on_download_progress: None,
            validate_response: None,
            on_validation_error: None,
        }
    }

    /// The timeout to enforce, with zero falling back to the default.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Whether the caller asked for upload progress.
    pub fn tracks_upload_progress(&self) -> bool {
        self.on_upload_progress.is_some()
    }

    /// Whether the caller's signal has already fired.
    pub fn is_cancelled(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("params_array_format", &self.params_array_format)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("credentials", &self.credentials)
            .field("signal", &self.signal.is_some())
            .field("retry", &self.retry)
            .field("response_type", &self.response_type)
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("validate_response", &self.validate_response.is_some())
            .field("on_validation_error", &self.on_validation_error.is_some())
            .finish()
    }
}
