//! Per-invocation router: middleware chains, route dispatch, and the
//! argument bundle handed to every handler.

mod route;

pub use route::{Route, RouteMethod};

use crate::cors::Cors;
use crate::error::GateError;
use crate::http::{GateRequest, GateResponse, ResponseBuilder};
use crate::logging::Logger;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one middleware or handler step.
#[derive(Debug, Clone)]
pub enum Flow {
    /// Fall through to the next step in the chain.
    Continue,
    /// Short-circuit with this response.
    Respond(GateResponse),
}

/// A middleware or route handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one dispatch step.
    async fn handle(&self, invocation: Invocation) -> Result<Flow, GateError>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F, Fut>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Flow, GateError>> + Send,
{
    HandlerFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F, Fut>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Flow, GateError>> + Send,
{
    async fn handle(&self, invocation: Invocation) -> Result<Flow, GateError> {
        (self.f)(invocation).await
    }
}

/// Caller-supplied hook invoked by the error boundary alongside the
/// standard fallback response.
#[async_trait]
pub trait ErrorHook: Send + Sync {
    /// Observe one failed invocation.
    async fn catch(&self, error: GateError, invocation: Invocation);
}

/// Extensible per-invocation bag: the synthesized native request, the CORS
/// engine handle, and a typed extension store.
#[derive(Clone)]
pub struct Internals {
    native: Arc<http::Request<Bytes>>,
    cors: Option<Arc<Cors>>,
    extensions: http::Extensions,
}

impl Internals {
    /// Create a new Internals bag.
    pub fn new(native: Arc<http::Request<Bytes>>, cors: Option<Arc<Cors>>) -> Self {
        Self {
            native,
            cors,
            extensions: http::Extensions::new(),
        }
    }

    /// The protocol-level request synthesized for this invocation.
    pub fn native(&self) -> &http::Request<Bytes> {
        &self.native
    }

    /// CORS engine handle, when negotiation is wired in.
    pub fn cors(&self) -> Option<&Arc<Cors>> {
        self.cors.as_ref()
    }

    /// Typed extension store.
    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    /// Mutable access to the extension store.
    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }
}

/// Argument bundle handed to every middleware and route handler.
#[derive(Clone)]
pub struct Invocation {
    /// The normalized host request.
    pub req: GateRequest,
    /// The host's response factory.
    pub res: ResponseBuilder,
    /// Gated log channel.
    pub log: Logger,
    /// Gated error-log channel.
    pub error: Logger,
    /// Path parameters captured by the matched route.
    pub params: HashMap<String, String>,
    /// The pending response, visible to finalizers.
    pub response: Option<GateResponse>,
    /// Extensible internals bag.
    pub internals: Internals,
}

impl Invocation {
    /// Create a new Invocation with no captured parameters or pending
    /// response.
    pub fn new(
        req: GateRequest,
        res: ResponseBuilder,
        log: Logger,
        error: Logger,
        internals: Internals,
    ) -> Self {
        Self {
            req,
            res,
            log,
            error,
            params: HashMap::new(),
            response: None,
            internals,
        }
    }

    /// Captured path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Options forwarded verbatim to router construction.
#[derive(Clone, Default)]
pub struct RouterOptions {
    /// Middleware run before route matching, in order.
    pub before: Vec<Arc<dyn Handler>>,
    /// Middleware run after dispatch, in order; each may replace the
    /// pending response.
    pub finally: Vec<Arc<dyn Handler>>,
    /// Hook handed to the error boundary.
    pub catch: Option<Arc<dyn ErrorHook>>,
}

/// One-invocation router.
///
/// Built fresh for every invocation from the caller's registration callback;
/// never shared or reused across invocations.
pub struct Router {
    routes: Vec<(Route, Arc<dyn Handler>)>,
    before: Vec<Arc<dyn Handler>>,
    finally: Vec<Arc<dyn Handler>>,
    catch: Option<Arc<dyn ErrorHook>>,
}

impl Router {
    /// Create a new router from forwarded options.
    pub fn new(options: RouterOptions) -> Self {
        Self {
            routes: Vec::new(),
            before: options.before,
            finally: options.finally,
            catch: options.catch,
        }
    }

    /// Register a route for an explicit method selector.
    pub fn route(
        &mut self,
        method: impl Into<RouteMethod>,
        path: impl Into<String>,
        handler: impl Handler + 'static,
    ) {
        self.routes.push((Route::new(method, path), Arc::new(handler)));
    }

    /// Register a GET route.
    pub fn get(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Get, path, handler);
    }

    /// Register a POST route.
    pub fn post(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Post, path, handler);
    }

    /// Register a PUT route.
    pub fn put(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Put, path, handler);
    }

    /// Register a PATCH route.
    pub fn patch(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Patch, path, handler);
    }

    /// Register a DELETE route.
    pub fn delete(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Delete, path, handler);
    }

    /// Register a HEAD route.
    pub fn head(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Head, path, handler);
    }

    /// Register an OPTIONS route.
    pub fn options(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Options, path, handler);
    }

    /// Register a route matching every method.
    pub fn all(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        self.route(RouteMethod::Any, path, handler);
    }

    /// The error hook forwarded at construction, if any.
    pub fn catch_hook(&self) -> Option<&Arc<dyn ErrorHook>> {
        self.catch.as_ref()
    }

    /// Drive one request through before middleware, route dispatch, and
    /// finalizers.
    ///
    /// Before middleware runs in order; a response from one skips the rest
    /// of the chain and route matching, but finalizers still run. Routes are
    /// tried in registration order; a handler returning [`Flow::Continue`]
    /// falls through to the next matching route. Each finalizer sees the
    /// pending response and may replace it.
    pub async fn fetch(&self, invocation: Invocation) -> Result<Option<GateResponse>, GateError> {
        let mut response: Option<GateResponse> = None;

        for middleware in &self.before {
            if let Flow::Respond(early) = middleware.handle(invocation.clone()).await? {
                response = Some(early);
                break;
            }
        }

        if response.is_none() {
            let method = invocation.req.method.as_str();
            for (route, handler) in &self.routes {
                let Some(params) = route.capture(&invocation.req.path, method) else {
                    continue;
                };
                debug!(path = %invocation.req.path, pattern = %route.path, "route matched");
                let mut scoped = invocation.clone();
                scoped.params = params;
                if let Flow::Respond(matched) = handler.handle(scoped).await? {
                    response = Some(matched);
                    break;
                }
            }
        }

        for finalizer in &self.finally {
            let mut scoped = invocation.clone();
            scoped.response = response.clone();
            if let Flow::Respond(replaced) = finalizer.handle(scoped).await? {
                response = Some(replaced);
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, StatusCode};

    fn test_invocation(method: Method, path: &str) -> Invocation {
        let native = Arc::new(http::Request::new(Bytes::new()));
        Invocation::new(
            GateRequest::new(method, path),
            ResponseBuilder::new(),
            Logger::noop(),
            Logger::noop(),
            Internals::new(native, None),
        )
    }

    #[test]
    fn test_route_dispatch_in_registration_order() {
        tokio_test::block_on(async {
            let mut router = Router::new(RouterOptions::default());
            router.get("/widgets", handler_fn(|inv: Invocation| async move {
                Ok(Flow::Respond(inv.res.text("first")))
            }));
            router.all("/widgets", handler_fn(|inv: Invocation| async move {
                Ok(Flow::Respond(inv.res.text("second")))
            }));

            let response = router
                .fetch(test_invocation(Method::Get, "/widgets"))
                .await
                .unwrap();
            assert_eq!(response.unwrap().text_body().as_deref(), Some("first"));
        });
    }

    #[test]
    fn test_continue_falls_through_to_next_route() {
        tokio_test::block_on(async {
            let mut router = Router::new(RouterOptions::default());
            router.get("/widgets", handler_fn(|_inv: Invocation| async move {
                Ok(Flow::Continue)
            }));
            router.get("/widgets", handler_fn(|inv: Invocation| async move {
                Ok(Flow::Respond(inv.res.text("fallback")))
            }));

            let response = router
                .fetch(test_invocation(Method::Get, "/widgets"))
                .await
                .unwrap();
            assert_eq!(response.unwrap().text_body().as_deref(), Some("fallback"));
        });
    }

    #[test]
    fn test_before_short_circuit_skips_routes_but_not_finalizers() {
        tokio_test::block_on(async {
            let options = RouterOptions {
                before: vec![Arc::new(handler_fn(|inv: Invocation| async move {
                    Ok(Flow::Respond(
                        inv.res.text("blocked").with_status(StatusCode::FORBIDDEN),
                    ))
                }))],
                finally: vec![Arc::new(handler_fn(|inv: Invocation| async move {
                    match inv.response {
                        Some(pending) => Ok(Flow::Respond(pending.header("x-final", "1"))),
                        None => Ok(Flow::Continue),
                    }
                }))],
                catch: None,
            };
            let mut router = Router::new(options);
            router.get("/widgets", handler_fn(|inv: Invocation| async move {
                Ok(Flow::Respond(inv.res.text("route")))
            }));

            let response = router
                .fetch(test_invocation(Method::Get, "/widgets"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(response.status, StatusCode::FORBIDDEN);
            assert_eq!(response.text_body().as_deref(), Some("blocked"));
            assert_eq!(response.get_header("x-final"), Some("1"));
        });
    }

    #[test]
    fn test_params_are_captured_per_dispatch() {
        tokio_test::block_on(async {
            let mut router = Router::new(RouterOptions::default());
            router.get("/widgets/:id", handler_fn(|inv: Invocation| async move {
                let id = inv.param("id").unwrap_or("?").to_string();
                Ok(Flow::Respond(inv.res.text(id)))
            }));

            let response = router
                .fetch(test_invocation(Method::Get, "/widgets/42"))
                .await
                .unwrap();
            assert_eq!(response.unwrap().text_body().as_deref(), Some("42"));
        });
    }

    #[test]
    fn test_no_match_yields_none() {
        tokio_test::block_on(async {
            let mut router = Router::new(RouterOptions::default());
            router.get("/widgets", handler_fn(|inv: Invocation| async move {
                Ok(Flow::Respond(inv.res.text("widgets")))
            }));

            let response = router
                .fetch(test_invocation(Method::Get, "/missing"))
                .await
                .unwrap();
            assert!(response.is_none());
        });
    }

    #[test]
    fn test_handler_error_propagates() {
        tokio_test::block_on(async {
            let mut router = Router::new(RouterOptions::default());
            router.get("/boom", handler_fn(|_inv: Invocation| async move {
                Err::<Flow, GateError>(GateError::new("handler exploded"))
            }));

            let result = router.fetch(test_invocation(Method::Get, "/boom")).await;
            assert!(result.is_err());
        });
    }
}
