//! Request bodies.
//!
//! Structured JSON is the default; form, blob and raw byte payloads pass
//! through without JSON serialization.

use bytes::Bytes;
use serde::Serialize;

use crate::{ApiError, Blob};

/// `application/json`
pub const APPLICATION_JSON: &str = "application/json";

/// `application/x-www-form-urlencoded`
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Ordered `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    Blob(Blob),
    Bytes(Bytes),
}

/// Bytes ready for the wire together with the content type the payload
/// implies when the caller has not set one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub default_content_type: Option<String>,
}

impl RequestBody {
    /// Build a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::request(format!("failed to serialize request body: {e}")))
    }

    /// Build a form body from ordered pairs.
    pub fn form<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Serialize the payload.
    pub fn encode(&self) -> Result<EncodedBody, ApiError> {
        match self {
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    ApiError::request(format!("failed to serialize request body: {e}"))
                })?;
                Ok(EncodedBody {
                    bytes: Bytes::from(bytes),
                    default_content_type: Some(APPLICATION_JSON.to_owned()),
                })
            }
            RequestBody::Form(pairs) => {
                let encoded = serde_urlencoded::to_string(pairs)
                    .map_err(|e| ApiError::request(format!("failed to encode form body: {e}")))?;
                Ok(EncodedBody {
                    bytes: Bytes::from(encoded),
                    default_content_type: Some(FORM_URLENCODED.to_owned()),
                })
            }
            RequestBody::Blob(blob) => Ok(EncodedBody {
                bytes: blob.bytes().clone(),
                default_content_type: blob.content_type().map(str::to_owned),
            }),
            RequestBody::Bytes(bytes) => Ok(EncodedBody {
                bytes: bytes.clone(),
                default_content_type: None,
            }),
        }
    }
}

/// Serialize `T` as a JSON request body.
#[derive(Clone, Copy, Debug)]
pub struct Json<T>(pub T);

/// Conversion into an optional request body.
pub trait IntoRequestBody {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError>;
}

impl IntoRequestBody for RequestBody {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(Some(self))
    }
}

impl<B: IntoRequestBody> IntoRequestBody for Option<B> {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        match self {
            Some(body) => body.into_request_body(),
            None => Ok(None),
        }
    }
}

impl IntoRequestBody for () {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(None)
    }
}

impl IntoRequestBody for serde_json::Value {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(Some(RequestBody::Json(self)))
    }
}

impl<T: Serialize> IntoRequestBody for Json<T> {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        RequestBody::json(&self.0).map(Some)
    }
}

impl IntoRequestBody for Blob {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(Some(RequestBody::Blob(self)))
    }
}

impl IntoRequestBody for Bytes {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(Some(RequestBody::Bytes(self)))
    }
}

impl IntoRequestBody for Vec<u8> {
    fn into_request_body(self) -> Result<Option<RequestBody>, ApiError> {
        Ok(Some(RequestBody::Bytes(Bytes::from(self))))
    }
}
