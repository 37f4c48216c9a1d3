//! Invocation assembly: the entry point that makes one host invocation
//! behave like a router-dispatched HTTP request, and the error boundary
//! wrapped around it.

use crate::cors::{build_cors_options, Cors, CorsFinalizer, PreflightInterceptor};
use crate::error::GateError;
use crate::http::{
    normalize_headers, to_native_request, GateRequest, GateResponse, ResponseBuilder, StatusCode,
};
use crate::logging::{gate_loggers, install_globals, Logger};
use crate::options::{is_production, FinalOptions, Options};
use crate::router::{Handler, Internals, Invocation, Router, RouterOptions};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

/// Per-invocation identifier, stored in the internals extension bag.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The host-provided bundle for one invocation: request, response factory,
/// and the two logging callbacks.
#[derive(Debug)]
pub struct InvocationContext {
    /// The incoming request.
    pub request: GateRequest,
    /// The host's response factory.
    pub response: ResponseBuilder,
    /// Host log callback.
    pub log: Logger,
    /// Host error-log callback.
    pub error: Logger,
}

impl InvocationContext {
    /// Create a new InvocationContext.
    pub fn new(request: GateRequest, log: Logger, error: Logger) -> Self {
        Self {
            request,
            response: ResponseBuilder::new(),
            log,
            error,
        }
    }
}

/// Construct a router from forwarded options.
///
/// A pass-through: the invocation assembly decides what middleware gets
/// merged in before this call.
pub fn create_router(options: RouterOptions) -> Router {
    Router::new(options)
}

/// Drive exactly one request through a constructed router.
pub async fn run_router(
    router: &Router,
    invocation: Invocation,
) -> Result<Option<GateResponse>, GateError> {
    router.fetch(invocation).await
}

/// Handle one host invocation end to end.
///
/// Normalizes headers, resolves options, wires the CORS pair around any
/// caller middleware, builds a fresh router, hands it to the registration
/// callback, runs one dispatch, and falls back to a 404 text response when
/// nothing answered. Every failure funnels to the error boundary; the host
/// always receives a well-formed response.
pub async fn handle_request<F>(
    context: InvocationContext,
    register: F,
    options: Options,
) -> GateResponse
where
    F: FnOnce(&mut Router),
{
    let InvocationContext {
        mut request,
        response: builder,
        log,
        error: error_log,
    } = context;

    normalize_headers(&mut request);

    let finals = FinalOptions::resolve(&options);
    let (log, error_log) = gate_loggers(&finals, log, error_log);

    let boundary_request = request.clone();
    match run(request, &builder, &log, &error_log, &finals, register).await {
        Ok(response) => response,
        Err(err) => handle_error(&err, &boundary_request, &builder, &log, &error_log, &finals).await,
    }
}

async fn run<F>(
    request: GateRequest,
    builder: &ResponseBuilder,
    log: &Logger,
    error_log: &Logger,
    finals: &FinalOptions,
    register: F,
) -> Result<GateResponse, GateError>
where
    F: FnOnce(&mut Router),
{
    install_globals(finals, &request, log, error_log);

    let cors = Arc::new(Cors::new(build_cors_options(finals)));
    let native = Arc::new(to_native_request(&request)?);

    // Preflight must win over any caller middleware; the finalizer must see
    // whatever the caller's own finalizers produced.
    let mut before: Vec<Arc<dyn Handler>> = Vec::with_capacity(finals.router.before.len() + 1);
    before.push(Arc::new(PreflightInterceptor));
    before.extend(finals.router.before.iter().cloned());
    let mut finally = finals.router.finally.clone();
    finally.push(Arc::new(CorsFinalizer));

    let mut router = create_router(RouterOptions {
        before,
        finally,
        catch: finals.router.catch.clone(),
    });
    register(&mut router);

    let request_id = generate_request_id();
    debug!(method = %request.method, path = %request.path, id = %request_id, "dispatching invocation");

    let mut internals = Internals::new(native, Some(cors));
    internals.extensions_mut().insert(RequestId(request_id));

    let invocation = Invocation::new(
        request,
        *builder,
        log.clone(),
        error_log.clone(),
        internals,
    );
    let response = run_router(&router, invocation).await?;

    Ok(match response {
        Some(response) => response,
        None => builder.text("Not found").with_status(StatusCode::NOT_FOUND),
    })
}

/// The error boundary: log, run the caller's catch hook, emit the fallback
/// response.
///
/// Disclosure is gated on the production flag. The body is JSON when the
/// original request's content type ends in a JSON-family suffix, plain text
/// otherwise, both at 500. The catch hook never suppresses the fallback.
pub async fn handle_error(
    err: &GateError,
    request: &GateRequest,
    builder: &ResponseBuilder,
    log: &Logger,
    error_log: &Logger,
    finals: &FinalOptions,
) -> GateResponse {
    error!(reason = %err, "invocation failed");
    error_log.emit(&format!("invocation failed: {err}"));

    if let Some(hook) = finals.router.catch.as_ref() {
        let native = Arc::new(
            to_native_request(request).unwrap_or_else(|_| http::Request::new(Bytes::new())),
        );
        let invocation = Invocation::new(
            request.clone(),
            *builder,
            log.clone(),
            error_log.clone(),
            Internals::new(native, None),
        );
        hook.catch(err.clone(), invocation).await;
    }

    let (message, cause) = if is_production() {
        (
            "Internal server error".to_string(),
            "Reason unknown".to_string(),
        )
    } else {
        (
            err.message.clone(),
            err.cause
                .clone()
                .unwrap_or_else(|| "Reason unknown".to_string()),
        )
    };

    let wants_json = request
        .get_header("content-type")
        .map(|value| value.ends_with("json"))
        .unwrap_or(false);

    if wants_json {
        let payload = serde_json::json!({
            "status": "error",
            "message": message,
            "error": cause,
        });
        match builder.json(&payload) {
            Ok(response) => response.with_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(_) => builder
                .text(format!("{message} {cause}"))
                .with_status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    } else {
        builder
            .text(format!("{message} {cause}"))
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
