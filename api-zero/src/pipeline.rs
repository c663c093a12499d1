//! Request pipeline.
//!
//! One call runs these stages in order:
//!
//! 1. Snapshot the client defaults and merge the call options into a
//!    [`RequestConfig`]
//! 2. Apply request body transforms
//! 3. Run the request interceptor chain
//! 4. Build the final URL
//! 5. Dispatch through the retry executor and a transport strategy
//! 6. Run the response interceptor chain over the outcome
//! 7. Apply response transforms, then the caller's validator
//! 8. Hand the response to the caller's finisher (e.g. typed decoding)
//!
//! Errors from any stage end the call. An error that already carries a
//! request config is returned as is.

use std::sync::Arc;

use api_zero_core::{
    ApiError, ArrayFormat, Params, RequestBody, RequestConfig, serialize_params, with_retry,
};
use http::Method;

use crate::client::{ApiClient, merge_headers};
use crate::config::ClientConfig;
use crate::options::RequestOptions;
use crate::response::Response;
use crate::transport::Strategy;

/// Run one call. `finish` turns the validated response into the caller's
/// output; its errors get the request config and reach the logger like any
/// other stage's.
pub(crate) async fn execute<T, F>(
    client: &ApiClient,
    method: Method,
    path: &str,
    body: Option<RequestBody>,
    options: RequestOptions,
    finish: F,
) -> Result<T, ApiError>
where
    F: FnOnce(Response) -> Result<T, ApiError>,
{
    let defaults = client.config();

    #[cfg(feature = "tracing")]
    let span = tracing::info_span!(
        "http.request",
        http.method = %method,
        http.path = %path,
        http.url = tracing::field::Empty,
        http.status = tracing::field::Empty,
        otel.kind = "client",
    );

    let fut = run(client, &defaults, method, path, body, options, finish);
    #[cfg(feature = "tracing")]
    let fut = tracing::Instrument::instrument(fut, span);

    let result = fut.await;
    if let (Err(err), Some(on_error)) = (&result, &defaults.logger.on_error) {
        on_error(err);
    }
    result
}

async fn run<T, F>(
    client: &ApiClient,
    defaults: &ClientConfig,
    method: Method,
    path: &str,
    body: Option<RequestBody>,
    options: RequestOptions,
    finish: F,
) -> Result<T, ApiError>
where
    F: FnOnce(Response) -> Result<T, ApiError>,
{
    let mut config = merge(defaults, method, path, body, options);

    for transform in &defaults.request_transforms {
        config.body = transform(config.body.take()).await?;
    }

    let mut config = client.interceptors().request.apply(Ok(config)).await?;

    config.url = build_url(
        &config.base_url,
        &config.path,
        &config.params,
        config.params_array_format,
    )?;
    let config = Arc::new(config);

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("http.url", config.url.as_str());

    if let Some(on_request) = &defaults.logger.on_request {
        on_request(&config);
    }
    #[cfg(feature = "tracing")]
    {
        if defaults.debug {
            tracing::debug!(
                method = %config.method,
                url = %config.url,
                headers = ?config.headers,
                "sending request"
            );
        }
    }

    let strategy = Strategy::select(&config);
    let transport = client.transport();
    let request_config: &RequestConfig = &config;
    let outcome = with_retry(config.retry.as_ref(), move || {
        strategy.send(transport, request_config)
    })
    .await
    .map_err(|e| e.or_config(&config));

    let mut response = client
        .interceptors()
        .response
        .apply(outcome)
        .await
        .map_err(|e| e.or_config(&config))?;

    #[cfg(feature = "tracing")]
    {
        tracing::Span::current().record("http.status", response.status.as_u16());
        if defaults.debug {
            tracing::debug!(
                status = response.status.as_u16(),
                url = %response.url,
                "received response"
            );
        }
    }
    if let Some(on_response) = &defaults.logger.on_response {
        on_response(&response);
    }

    for transform in &defaults.response_transforms {
        let data = std::mem::take(&mut response.data);
        response.data = transform(data)
            .await
            .map_err(|e| e.or_config(&config))?;
    }

    if let Some(validate) = &config.validate_response {
        let rejection = match validate(response.data.clone()).await {
            Ok(true) => None,
            Ok(false) => Some("Response validation failed".to_owned()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(message) = rejection {
            let err = ApiError::validation(message, Some(response.data))
                .with_config(config.clone());
            if let Some(hook) = &config.on_validation_error {
                hook(&err);
            }
            return Err(err);
        }
    }

    finish(response).map_err(|e| e.or_config(&config))
}

/// Merge the client defaults with per-call options.
///
/// Headers merge key by key; every other option replaces the default when
/// it is set.
fn merge(
    defaults: &ClientConfig,
    method: Method,
    path: &str,
    body: Option<RequestBody>,
    options: RequestOptions,
) -> RequestConfig {
    let mut headers = defaults.headers.clone();
    merge_headers(&mut headers, &options.headers);

    let mut config = RequestConfig::new(method, path);
    config.base_url = options
        .base_url
        .unwrap_or_else(|| defaults.base_url.clone());
    config.params = options.params;
    config.params_array_format = options
        .params_array_format
        .unwrap_or(defaults.params_array_format);
    config.headers = headers;
    config.body = body;
    config.timeout = options.timeout.unwrap_or(defaults.timeout);
    config.credentials = options.credentials.unwrap_or(defaults.credentials);
    config.signal = options.signal;
    config.retry = match options.retry {
        Some(retry) => retry,
        None => defaults.retry.clone(),
    };
    config.response_type = options.response_type.unwrap_or_default();
    config.on_upload_progress = options.on_upload_progress;
    config.on_download_progress = options.on_download_progress;
    config.validate_response = options.validate_response;
    config.on_validation_error = options.on_validation_error;
    config
}

/// Join `base` and `path` with exactly one `/` and append the query string.
///
/// An empty path yields the base alone. The query is appended with `&` when
/// the URL already has one, `?` otherwise.
pub(crate) fn build_url(
    base: &str,
    path: &str,
    params: &Params,
    format: ArrayFormat,
) -> Result<String, ApiError> {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut url = if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    };

    let query = serialize_params(params, format)
        .map_err(|e| ApiError::request(format!("failed to serialize query params: {e}")))?;
    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }
    Ok(url)
}
