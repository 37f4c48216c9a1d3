//! Route entries: method selectors and path patterns.

use std::collections::HashMap;

use crate::http::Method;

/// HTTP method selector for a route, including a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl RouteMethod {
    /// Check if this selector accepts the given method name.
    pub fn matches(&self, method: &str) -> bool {
        match self {
            RouteMethod::Any => true,
            RouteMethod::Get => method.eq_ignore_ascii_case("GET"),
            RouteMethod::Post => method.eq_ignore_ascii_case("POST"),
            RouteMethod::Put => method.eq_ignore_ascii_case("PUT"),
            RouteMethod::Delete => method.eq_ignore_ascii_case("DELETE"),
            RouteMethod::Patch => method.eq_ignore_ascii_case("PATCH"),
            RouteMethod::Head => method.eq_ignore_ascii_case("HEAD"),
            RouteMethod::Options => method.eq_ignore_ascii_case("OPTIONS"),
        }
    }
}

impl From<&str> for RouteMethod {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "POST" => RouteMethod::Post,
            "PUT" => RouteMethod::Put,
            "DELETE" => RouteMethod::Delete,
            "PATCH" => RouteMethod::Patch,
            "HEAD" => RouteMethod::Head,
            "OPTIONS" => RouteMethod::Options,
            "*" | "ANY" => RouteMethod::Any,
            _ => RouteMethod::Get,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => RouteMethod::Get,
            Method::Post => RouteMethod::Post,
            Method::Put => RouteMethod::Put,
            Method::Delete => RouteMethod::Delete,
            Method::Patch => RouteMethod::Patch,
            Method::Head => RouteMethod::Head,
            Method::Options => RouteMethod::Options,
        }
    }
}

/// A registered route pattern.
///
/// Patterns are exact paths, `:param` segments, or a trailing `/*` prefix
/// wildcard.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route path pattern (e.g., `/widgets/:id`).
    pub path: String,
    /// HTTP method selector for this route.
    pub method: RouteMethod,
}

impl Route {
    /// Create a new route.
    pub fn new(method: impl Into<RouteMethod>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }

    /// Check if this route matches the given path and method.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        if !self.method.matches(method) {
            return false;
        }

        if let Some(prefix) = self.path.strip_suffix("/*") {
            path.starts_with(prefix)
        } else if self.path.contains(':') {
            let route_segments: Vec<&str> = self.path.split('/').collect();
            let path_segments: Vec<&str> = path.split('/').collect();

            route_segments.len() == path_segments.len()
                && route_segments
                    .iter()
                    .zip(path_segments.iter())
                    .all(|(r, p)| r.starts_with(':') || r == p)
        } else {
            self.path == path
        }
    }

    /// Capture `:param` segments for a matching path.
    ///
    /// Returns `None` when the route does not match.
    // TODO: percent-decode captured segments
    pub fn capture(&self, path: &str, method: &str) -> Option<HashMap<String, String>> {
        if !self.matches(path, method) {
            return None;
        }
        let mut params = HashMap::new();
        if self.path.contains(':') {
            for (pattern, actual) in self.path.split('/').zip(path.split('/')) {
                if let Some(name) = pattern.strip_prefix(':') {
                    params.insert(name.to_string(), actual.to_string());
                }
            }
        }
        Some(params)
    }
}
