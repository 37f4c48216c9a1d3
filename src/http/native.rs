//! Conversions between the host request/response shapes and the standard
//! `http` crate representation used for CORS negotiation.

use crate::error::GateError;
use crate::http::{GateRequest, GateResponse, ResponseBuilder, StatusCode};
use bytes::Bytes;
use std::collections::HashMap;

/// Synthesize a protocol-level request from the host request.
///
/// Middleware that needs standard request semantics (CORS negotiation in
/// particular) operates on this representation instead of the host's.
pub fn to_native_request(request: &GateRequest) -> Result<http::Request<Bytes>, GateError> {
    let uri = if !request.url.is_empty() {
        request.url.clone()
    } else if !request.path.is_empty() {
        request.path.clone()
    } else {
        "/".to_string()
    };

    let mut builder = http::Request::builder()
        .method(request.method.as_str())
        .uri(uri);
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
        .body(request.body.clone().unwrap_or_default())
        .map_err(|err| GateError::with_cause("failed to synthesize native request", err.to_string()))
}

/// Synthesize a native response from a host response.
///
/// A 204 never carries a body, whatever the route attached to it.
pub fn to_native_response(response: &GateResponse) -> Result<http::Response<Bytes>, GateError> {
    let mut builder = http::Response::builder().status(response.status.0);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    let body = if response.status == StatusCode::NO_CONTENT {
        Bytes::new()
    } else {
        response.body.clone().unwrap_or_default()
    };
    builder
        .body(body)
        .map_err(|err| GateError::with_cause("failed to synthesize native response", err.to_string()))
}

/// Convert a native response back into the host response shape.
///
/// Round-trips through [`ResponseBuilder::send`] so the result honors the
/// host's serialization contract.
pub fn from_native_response(
    response: http::Response<Bytes>,
    builder: &ResponseBuilder,
) -> GateResponse {
    let (parts, body) = response.into_parts();
    let mut headers = HashMap::new();
    for (key, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            headers.insert(key.as_str().to_string(), value.to_string());
        }
    }
    builder.send(body, parts.status.as_u16(), headers)
}
