//! Progress strategy: chunked upload and frame-by-frame download, reporting
//! cumulative bytes to the caller's callbacks.

use api_zero_core::{ApiError, Progress, RequestConfig};
use bytes::BytesMut;
use http::header::CONTENT_LENGTH;
use http_body_util::BodyExt;

use super::body::TransportBody;
use super::hyper::HyperTransport;
use super::{decode, prepare_request, with_deadline};
use crate::Response;

pub(crate) async fn send(
    transport: &HyperTransport,
    config: &RequestConfig,
) -> Result<Response, ApiError> {
    with_deadline(config, async {
        let (request, payload) = prepare_request(config)?;
        let body = match (payload, &config.on_upload_progress) {
            (Some(bytes), Some(on_progress)) => {
                TransportBody::metered(bytes, on_progress.clone())
            }
            (Some(bytes), None) => TransportBody::full(bytes),
            (None, _) => TransportBody::empty(),
        };

        let response = transport.request(request.map(|()| body)).await?;
        let (parts, mut incoming) = response.into_parts();

        let total = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let mut buffer = BytesMut::new();
        while let Some(frame) = incoming.frame().await {
            let frame = frame
                .map_err(|e| ApiError::network(format!("failed to read response body: {e}")))?;
            if let Ok(data) = frame.into_data() {
                buffer.extend_from_slice(&data);
                if let Some(on_progress) = &config.on_download_progress {
                    on_progress(Progress::new(buffer.len() as u64, total));
                }
            }
        }

        decode::into_response(config, parts, buffer.freeze())
    })
    .await
}
