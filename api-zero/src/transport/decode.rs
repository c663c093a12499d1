//! Response decoding shared by both strategies.

use api_zero_core::{ApiError, Blob, RequestConfig, ResponseData, ResponseType};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::response::Parts;

use crate::Response;

/// Turn a received response into the pipeline's success/error contract.
///
/// Non-2xx statuses become HTTP errors carrying the decoded body; 2xx bodies
/// are decoded according to the configured [`ResponseType`].
pub(crate) fn into_response(
    config: &RequestConfig,
    parts: Parts,
    body: Bytes,
) -> Result<Response, ApiError> {
    let status = parts.status;

    if !status.is_success() {
        return Err(ApiError::http(
            status.as_u16(),
            status_text(&parts),
            decode_error_body(body),
        ));
    }

    let data = decode_body(config.response_type, &parts, body)
        .map_err(|message| ApiError::decode(status.as_u16(), message))?;
    Ok(Response::new(status, parts.headers, config.url.clone(), data))
}

/// Reason phrase from the wire, falling back to the canonical one.
fn status_text(parts: &Parts) -> String {
    if let Some(reason) = parts.extensions.get::<hyper::ext::ReasonPhrase>() {
        return String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }
    parts.status.canonical_reason().unwrap_or_default().to_owned()
}

/// Structured body if it parses as JSON, raw text otherwise.
fn decode_error_body(body: Bytes) -> Option<ResponseData> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(&body) {
        Ok(value) => Some(ResponseData::Json(value)),
        Err(_) => Some(ResponseData::Text(String::from_utf8_lossy(&body).into_owned())),
    }
}

fn decode_body(mode: ResponseType, parts: &Parts, body: Bytes) -> Result<ResponseData, String> {
    match mode {
        ResponseType::Json => {
            if body.is_empty() {
                return Ok(ResponseData::Json(serde_json::Value::Null));
            }
            serde_json::from_slice(&body)
                .map(ResponseData::Json)
                .map_err(|e| format!("failed to parse JSON response: {e}"))
        }
        ResponseType::Text => Ok(ResponseData::Text(
            String::from_utf8_lossy(&body).into_owned(),
        )),
        ResponseType::Blob => {
            let blob = Blob::new(body);
            let blob = match parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
                Some(content_type) => blob.with_content_type(content_type),
                None => blob,
            };
            Ok(ResponseData::Blob(blob))
        }
        ResponseType::Bytes => Ok(ResponseData::Bytes(body)),
    }
}
