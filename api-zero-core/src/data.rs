//! Decoded response payloads.
//!
//! - [`ResponseType`]: How a response body should be decoded
//! - [`ResponseData`]: The decoded body, tagged by the mode that produced it
//! - [`Blob`]: Raw bytes together with the content type they arrived with

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

/// Response decoding mode.
///
/// Defaults to [`ResponseType::Json`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
    /// Raw body bytes (`arraybuffer` in browser terms).
    Bytes,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Blob => "blob",
            ResponseType::Bytes => "bytes",
        }
    }
}

/// Binary payload with its MIME type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob {
    content_type: Option<String>,
    bytes: Bytes,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Attach a MIME type to the blob.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// A decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseData {
    Json(serde_json::Value),
    Text(String),
    Blob(Blob),
    Bytes(Bytes),
}

impl Default for ResponseData {
    fn default() -> Self {
        ResponseData::Json(serde_json::Value::Null)
    }
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Raw bytes for the binary modes (`Blob` and `Bytes`).
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::Blob(blob) => Some(blob.bytes()),
            ResponseData::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResponseData::Json(serde_json::Value::Null))
    }

    /// Deserialize the payload into `T`.
    ///
    /// JSON payloads are converted directly. Text is treated as a JSON string,
    /// and binary payloads are parsed as JSON documents.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            ResponseData::Json(value) => T::deserialize(value),
            ResponseData::Text(text) => T::deserialize(serde_json::Value::String(text.clone())),
            ResponseData::Blob(blob) => serde_json::from_slice(blob.bytes()),
            ResponseData::Bytes(bytes) => serde_json::from_slice(bytes),
        }
    }
}

impl From<serde_json::Value> for ResponseData {
    fn from(value: serde_json::Value) -> Self {
        ResponseData::Json(value)
    }
}

impl From<String> for ResponseData {
    fn from(text: String) -> Self {
        ResponseData::Text(text)
    }
}

impl From<&str> for ResponseData {
    fn from(text: &str) -> Self {
        ResponseData::Text(text.to_owned())
    }
}

impl From<Bytes> for ResponseData {
    fn from(bytes: Bytes) -> Self {
        ResponseData::Bytes(bytes)
    }
}

impl Serialize for ResponseData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ResponseData::Json(value) => value.serialize(serializer),
            ResponseData::Text(text) => serializer.serialize_str(text),
            // Binary payloads have no faithful JSON form; expose their size only
            ResponseData::Blob(blob) => {
                use serde::ser::SerializeStruct;
                let mut s = serializer.serialize_struct("Blob", 2)?;
                s.serialize_field("type", &blob.content_type)?;
                s.serialize_field("size", &blob.len())?;
                s.end()
            }
            ResponseData::Bytes(bytes) => {
                use serde::ser::SerializeStruct;
                let mut s = serializer.serialize_struct("Bytes", 1)?;
                s.serialize_field("size", &bytes.len())?;
                s.end()
            }
        }
    }
}
