//! Host-side HTTP response type and the builder contract for producing it.

use crate::error::GateError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const FOUND: StatusCode = StatusCode(302);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Check if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if the status code indicates a redirect (3xx).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.0)
    }

    /// Check if the status code indicates a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Check if the status code indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

/// Host-shaped HTTP response: status, headers, optional body.
///
/// Always produced through [`ResponseBuilder`], never assembled by hand, so
/// every response satisfies the host's serialization contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// HTTP headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
}

impl GateResponse {
    /// Add a header to the response.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace the status code.
    pub fn with_status(mut self, status: impl Into<StatusCode>) -> Self {
        self.status = status.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get the body as text if present.
    pub fn text_body(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the body as JSON if present.
    pub fn json_body<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<T, serde_json::Error>> {
        self.body.as_ref().map(|b| serde_json::from_slice(b))
    }
}

impl std::fmt::Display for GateResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Some(body) => f.write_str(&String::from_utf8_lossy(body)),
            None => Ok(()),
        }
    }
}

/// Factory for host responses.
///
/// The host hands one of these in with every invocation; its methods are the
/// only sanctioned way to produce a [`GateResponse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a new ResponseBuilder.
    pub fn new() -> Self {
        Self
    }

    /// Raw send: body, status and headers taken as-is.
    ///
    /// An empty body collapses to an absent one.
    pub fn send(
        &self,
        body: impl Into<Bytes>,
        status: impl Into<StatusCode>,
        headers: HashMap<String, String>,
    ) -> GateResponse {
        let body = body.into();
        GateResponse {
            status: status.into(),
            headers,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }

    /// A 200 text response.
    pub fn text(&self, content: impl Into<String>) -> GateResponse {
        GateResponse {
            status: StatusCode::OK,
            headers: HashMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: Some(content.into().into()),
        }
    }

    /// A 200 JSON response.
    pub fn json<T: serde::Serialize>(&self, data: &T) -> Result<GateResponse, GateError> {
        let body = serde_json::to_vec(data)?;
        Ok(GateResponse {
            status: StatusCode::OK,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: Some(body.into()),
        })
    }

    /// A 200 binary response.
    pub fn binary(&self, data: impl Into<Bytes>) -> GateResponse {
        GateResponse {
            status: StatusCode::OK,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/octet-stream".to_string(),
            )]),
            body: Some(data.into()),
        }
    }

    /// A bodiless 204 response.
    pub fn empty(&self) -> GateResponse {
        GateResponse {
            status: StatusCode::NO_CONTENT,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// A 301 redirect to the given location.
    pub fn redirect(&self, location: impl Into<String>) -> GateResponse {
        GateResponse {
            status: StatusCode::MOVED_PERMANENTLY,
            headers: HashMap::from([("location".to_string(), location.into())]),
            body: None,
        }
    }
}
