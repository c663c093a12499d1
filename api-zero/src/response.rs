//! The response object that flows through response interceptors.

use api_zero_core::{ApiError, ResponseData};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// A decoded HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// The URL the request was sent to.
    pub url: String,
    pub data: ResponseData,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, url: impl Into<String>, data: ResponseData) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn data(&self) -> &ResponseData {
        &self.data
    }

    pub fn into_data(self) -> ResponseData {
        self.data
    }

    /// Deserialize the payload into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.data.deserialize().map_err(|e| {
            ApiError::decode(
                self.status.as_u16(),
                format!("failed to deserialize response: {e}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let response = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            "http://localhost/users/1",
            json!({"id": 1}).into(),
        );
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 1);

        let err = response.json::<Vec<u32>>().unwrap_err();
        assert_eq!(err.kind(), api_zero_core::ErrorKind::Decode);
        assert_eq!(err.status(), 200);
    }
}
