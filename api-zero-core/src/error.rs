//! Request error types.
//!
//! Every failed request surfaces as a single [`ApiError`]. The cause is an
//! explicit [`ErrorKind`] discriminant, so callers branch on structure rather
//! than on message text.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::{RequestConfig, ResponseData};

/// Classification of a request failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The server answered with a non-2xx status.
    Http,
    /// The internal deadline elapsed before a response arrived.
    Timeout,
    /// The caller's cancellation signal fired.
    Aborted,
    /// The request could not be completed (DNS, connection refused, reset).
    Network,
    /// The response was decoded but rejected by the caller's validator.
    Validation,
    /// A successful response body could not be decoded.
    Decode,
    /// The request could not be built locally.
    Request,
}

impl ErrorKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Http => "http",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Decode => "decode",
            ErrorKind::Request => "request",
        }
    }
}

/// The uniform failure type returned by the request pipeline.
///
/// Carries the HTTP status (0 when no response was obtained), the status
/// text, the decoded error body when there was one, and the effective
/// configuration of the request that produced it.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: u16,
    status_text: String,
    data: Option<ResponseData>,
    config: Option<Arc<RequestConfig>>,
}

impl ApiError {
    fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            status_text: status_text.into(),
            data: None,
            config: None,
        }
    }

    /// A non-2xx response.
    ///
    /// The message is the status text, or `Error on request` when the
    /// response carried none.
    pub fn http(status: u16, status_text: impl Into<String>, data: Option<ResponseData>) -> Self {
        let status_text = status_text.into();
        let message = if status_text.is_empty() {
            "Error on request".to_owned()
        } else {
            status_text.clone()
        };
        Self {
            data,
            ..Self::new(ErrorKind::Http, message, status, status_text)
        }
    }

    /// The internal deadline elapsed.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "Request timeout", 408, "Timeout")
    }

    /// The caller cancelled the request.
    pub fn aborted() -> Self {
        Self::new(ErrorKind::Aborted, "Request aborted", 0, "Aborted")
    }

    /// The transport could not complete the exchange.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message, 0, "Network Error")
    }

    /// The caller's validator rejected a decoded response.
    pub fn validation(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            data,
            ..Self::new(ErrorKind::Validation, message, 0, "Validation Error")
        }
    }

    /// A response body could not be decoded.
    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message, status, "Decode Error")
    }

    /// The request could not be built.
    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, message, 0, "Request Error")
    }

    /// Attach the configuration of the request that failed.
    pub fn with_config(mut self, config: Arc<RequestConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Attach config only when none is recorded yet.
    pub fn or_config(self, config: &Arc<RequestConfig>) -> Self {
        if self.config.is_some() {
            self
        } else {
            self.with_config(config.clone())
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code, or 0 when no response was obtained.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// The decoded response body, if any.
    pub fn data(&self) -> Option<&ResponseData> {
        self.data.as_ref()
    }

    /// The effective configuration of the failing request.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_deref()
    }

    pub fn is_http_error(&self) -> bool {
        self.kind == ErrorKind::Http
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }

    pub fn is_validation_error(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Status is in the 400..500 range.
    pub fn is_4xx(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Status is in the 500..600 range.
    pub fn is_5xx(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ApiError", 9)?;
        s.serialize_field("name", "ApiError")?;
        s.serialize_field("message", &self.message)?;
        s.serialize_field("status", &self.status)?;
        s.serialize_field("statusText", &self.status_text)?;
        s.serialize_field("data", &self.data)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("isTimeout", &self.is_timeout())?;
        s.serialize_field("isNetworkError", &self.is_network_error())?;
        s.serialize_field("isAborted", &self.is_aborted())?;
        s.end()
    }
}
