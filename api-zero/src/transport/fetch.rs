//! Default strategy: send the body in one frame, buffer the response.

use api_zero_core::{ApiError, RequestConfig};
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
        let body = payload.map_or_else(TransportBody::empty, TransportBody::full);

        let response = transport.request(request.map(|()| body)).await?;
        let (parts, incoming) = response.into_parts();
        let bytes = incoming
            .collect()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response body: {e}")))?
            .to_bytes();

        decode::into_response(config, parts, bytes)
    })
    .await
}
