//! Cross-origin negotiation: policy construction, the native-level engine,
//! and the middleware pair wired around every dispatch.

use crate::error::GateError;
use crate::http::{from_native_response, to_native_response};
use crate::options::{is_production, FinalOptions, OriginRule};
use crate::router::{Flow, Handler, Invocation};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN, VARY,
};

/// Development origins appended to the allow-list outside production.
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

fn default_methods() -> Vec<String> {
    vec![
        "GET".into(),
        "POST".into(),
        "PATCH".into(),
        "DELETE".into(),
        "OPTIONS".into(),
    ]
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".into(), "Authorization".into()]
}

/// Resolved cross-origin policy: origin matcher plus allow-lists.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<OriginRule>,
    /// Methods advertised on preflight answers.
    pub allow_methods: Vec<String>,
    /// Headers advertised on preflight answers.
    pub allow_headers: Vec<String>,
}

impl CorsPolicy {
    /// Decide whether a candidate origin is allowed.
    ///
    /// Returns the candidate itself so responses reflect the requesting
    /// origin instead of a wildcard, which matters for credentialed
    /// requests. `None` means deny.
    pub fn origin<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        self.origins
            .iter()
            .any(|rule| rule.allows(candidate))
            .then_some(candidate)
    }

    /// The effective origin rules, caller-supplied plus any appended
    /// development origins.
    pub fn origin_rules(&self) -> &[OriginRule] {
        &self.origins
    }
}

/// Build the effective policy from resolved options.
///
/// The caller's origin list is copied, never mutated in place; outside
/// production the conventional local development origins are appended
/// unless already present.
pub fn build_cors_options(options: &FinalOptions) -> CorsPolicy {
    let mut origins = options.cors.allowed_origins.clone();
    if !is_production() {
        for dev in DEV_ORIGINS {
            let present = origins
                .iter()
                .any(|rule| matches!(rule, OriginRule::Exact(origin) if origin == dev));
            if !present {
                origins.push(OriginRule::Exact(dev.to_string()));
            }
        }
    }
    CorsPolicy {
        origins,
        allow_methods: options
            .cors
            .allow_methods
            .clone()
            .unwrap_or_else(default_methods),
        allow_headers: options
            .cors
            .allow_headers
            .clone()
            .unwrap_or_else(default_headers),
    }
}

/// CORS engine over the native request/response pair.
#[derive(Debug, Clone)]
pub struct Cors {
    policy: CorsPolicy,
}

impl Cors {
    /// Create a new engine for a resolved policy.
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }

    /// The policy this engine negotiates with.
    pub fn policy(&self) -> &CorsPolicy {
        &self.policy
    }

    /// Answer a preflight request, or `None` when the request is not one.
    ///
    /// A preflight is an OPTIONS request carrying an `Origin` header. The
    /// answer is a 204 whose allow headers are present only for an allowed
    /// origin; a denied origin gets the bare 204.
    pub fn preflight(&self, request: &http::Request<Bytes>) -> Option<http::Response<Bytes>> {
        if request.method() != http::Method::OPTIONS {
            return None;
        }
        let origin = request.headers().get(ORIGIN)?.to_str().ok()?;

        let mut builder = http::Response::builder().status(http::StatusCode::NO_CONTENT);
        if let Some(allowed) = self.policy.origin(origin) {
            builder = builder
                .header(ACCESS_CONTROL_ALLOW_ORIGIN, allowed)
                .header(ACCESS_CONTROL_ALLOW_METHODS, self.policy.allow_methods.join(", "))
                .header(ACCESS_CONTROL_ALLOW_HEADERS, self.policy.allow_headers.join(", "))
                .header(VARY, "Origin");
        }
        builder.body(Bytes::new()).ok()
    }

    /// Decorate an outgoing response with origin reflection headers.
    ///
    /// Responses already carrying an allow-origin header (a preflight
    /// answer) and requests without an `Origin` pass through untouched.
    pub fn corsify(
        &self,
        mut response: http::Response<Bytes>,
        request: &http::Request<Bytes>,
    ) -> http::Response<Bytes> {
        if response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
            return response;
        }
        let Some(origin) = request.headers().get(ORIGIN).and_then(|v| v.to_str().ok()) else {
            return response;
        };
        if let Some(allowed) = self.policy.origin(origin) {
            if let Ok(value) = http::HeaderValue::from_str(allowed) {
                response
                    .headers_mut()
                    .insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                response
                    .headers_mut()
                    .insert(VARY, http::HeaderValue::from_static("Origin"));
            }
        }
        response
    }
}

/// Before-chain middleware answering preflight requests without touching
/// routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreflightInterceptor;

#[async_trait]
impl Handler for PreflightInterceptor {
    async fn handle(&self, invocation: Invocation) -> Result<Flow, GateError> {
        let Some(cors) = invocation.internals.cors() else {
            return Ok(Flow::Continue);
        };
        match cors.preflight(invocation.internals.native()) {
            Some(native) => Ok(Flow::Respond(from_native_response(native, &invocation.res))),
            None => Ok(Flow::Continue),
        }
    }
}

/// Finally-chain middleware applying origin reflection to the outgoing
/// response.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorsFinalizer;

#[async_trait]
impl Handler for CorsFinalizer {
    async fn handle(&self, invocation: Invocation) -> Result<Flow, GateError> {
        let Some(response) = invocation.response.as_ref() else {
            return Ok(Flow::Continue);
        };
        let Some(cors) = invocation.internals.cors() else {
            return Ok(Flow::Continue);
        };
        let native = to_native_response(response)?;
        let decorated = cors.corsify(native, invocation.internals.native());
        Ok(Flow::Respond(from_native_response(decorated, &invocation.res)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn policy_for(options: Options) -> CorsPolicy {
        build_cors_options(&FinalOptions::resolve(&options))
    }

    fn native_request(method: http::Method, headers: &[(&str, &str)]) -> http::Request<Bytes> {
        let mut builder = http::Request::builder().method(method).uri("/widgets");
        for (key, value) in headers {
            builder = builder.header(*key, *value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_origin_reflection() {
        let policy = policy_for(Options::new().allow_origin("https://a.test"));

        assert_eq!(policy.origin("https://a.test"), Some("https://a.test"));
        assert_eq!(policy.origin("https://b.test"), None);
    }

    #[test]
    fn test_origin_pattern_match() {
        let rule = crate::options::OriginRule::pattern(r"^https://.*\.a\.test$").unwrap();
        let mut options = Options::new();
        options.cors.allowed_origins.push(rule);
        let policy = policy_for(options);

        assert_eq!(policy.origin("https://pr-1.a.test"), Some("https://pr-1.a.test"));
        assert_eq!(policy.origin("https://a.test.evil"), None);
    }

    #[test]
    fn test_dev_origins_appended_outside_production() {
        // ENVIRONMENT is unset in the test environment.
        let caller = Options::new().allow_origin("https://a.test");
        let caller_origins = caller.cors.allowed_origins.len();
        let policy = policy_for(caller.clone());

        assert_eq!(policy.origin("http://localhost:3000"), Some("http://localhost:3000"));
        assert_eq!(policy.origin("http://localhost:5173"), Some("http://localhost:5173"));
        // Copy-on-write: the caller's list is untouched.
        assert_eq!(caller.cors.allowed_origins.len(), caller_origins);
    }

    #[test]
    fn test_dev_origin_append_is_idempotent() {
        let policy = policy_for(Options::new().allow_origin("http://localhost:3000"));

        assert_eq!(policy.origin("http://localhost:3000"), Some("http://localhost:3000"));
        // The caller's rule plus the one other dev origin, never a duplicate.
        assert_eq!(policy.origin_rules().len(), 2);
        let duplicates = policy
            .origin_rules()
            .iter()
            .filter(|rule| rule.allows("http://localhost:3000"))
            .count();
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_default_allow_lists() {
        let policy = policy_for(Options::new());
        assert_eq!(
            policy.allow_methods,
            vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"]
        );
        assert_eq!(policy.allow_headers, vec!["Content-Type", "Authorization"]);
    }

    #[test]
    fn test_preflight_answers_options_with_origin() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));
        let request = native_request(
            http::Method::OPTIONS,
            &[("origin", "https://a.test"), ("access-control-request-method", "POST")],
        );

        let response = cors.preflight(&request).unwrap();
        assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://a.test")
        );
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[test]
    fn test_preflight_denied_origin_gets_bare_answer() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));
        let request = native_request(http::Method::OPTIONS, &[("origin", "https://b.test")]);

        let response = cors.preflight(&request).unwrap();
        assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_preflight_ignores_non_options_and_no_origin() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));

        let get = native_request(http::Method::GET, &[("origin", "https://a.test")]);
        assert!(cors.preflight(&get).is_none());

        let bare = native_request(http::Method::OPTIONS, &[]);
        assert!(cors.preflight(&bare).is_none());
    }

    #[test]
    fn test_corsify_reflects_allowed_origin() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));
        let request = native_request(http::Method::GET, &[("origin", "https://a.test")]);
        let response = http::Response::builder()
            .status(200)
            .body(Bytes::from_static(b"ok"))
            .unwrap();

        let decorated = cors.corsify(response, &request);
        assert_eq!(
            decorated
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://a.test")
        );
    }

    #[test]
    fn test_corsify_skips_already_decorated_responses() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));
        let request = native_request(http::Method::GET, &[("origin", "https://a.test")]);
        let response = http::Response::builder()
            .status(204)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "https://other.test")
            .body(Bytes::new())
            .unwrap();

        let decorated = cors.corsify(response, &request);
        assert_eq!(
            decorated
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://other.test")
        );
    }

    #[test]
    fn test_corsify_leaves_denied_origin_undecorated() {
        let cors = Cors::new(policy_for(Options::new().allow_origin("https://a.test")));
        let request = native_request(http::Method::GET, &[("origin", "https://b.test")]);
        let response = http::Response::builder().status(200).body(Bytes::new()).unwrap();

        let decorated = cors.corsify(response, &request);
        assert!(!decorated.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
