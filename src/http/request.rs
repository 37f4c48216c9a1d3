//! Host-side HTTP request type with fetch-like body accessors.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP method enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            _ => Method::Get,
        }
    }
}

/// Host-provided HTTP request for one invocation.
///
/// The host owns this object; the pipeline only rewrites its header map to
/// the lowercase-key form before dispatch. Header lookups assume that
/// invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL.
    pub url: String,
    /// URL scheme.
    pub scheme: String,
    /// Host name.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Path component.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query_string: String,
    /// HTTP headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
}

impl GateRequest {
    /// Create a new GateRequest for the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            url: path.clone(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 80,
            path,
            query_string: String::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Add a header to the request, key stored as given by the host.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup over the normalized map.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Whether a header is present, case-insensitively.
    pub fn has_header(&self, key: &str) -> bool {
        self.headers.contains_key(key.to_ascii_lowercase().as_str())
    }

    /// Write-through insert preserving the lowercase key invariant.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Raw body bytes, if any.
    pub fn body_raw(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Body decoded as UTF-8 text, if present.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Body parsed as JSON, if present.
    pub fn body_json<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<T, serde_json::Error>> {
        self.body.as_ref().map(|b| serde_json::from_slice(b))
    }

    /// Body as an owned byte vector, if present.
    pub fn body_binary(&self) -> Option<Vec<u8>> {
        self.body.as_ref().map(|b| b.to_vec())
    }
}

impl Default for GateRequest {
    fn default() -> Self {
        Self::new(Method::Get, "/")
    }
}
