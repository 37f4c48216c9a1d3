//! # Routegate - Router Gateway for Single-Shot Function Hosts
//!
//! Routegate makes a constrained serverless invocation model behave like an
//! ordinary router-dispatched HTTP server. The host hands the function one
//! opaque bundle per call (request, response factory, two logging
//! callbacks); routegate normalizes the request, resolves options, wires
//! cross-origin negotiation around every dispatch, builds a fresh router
//! from the caller's registration callback, runs exactly one dispatch, and
//! wraps the whole cycle in a centralized error boundary so the host always
//! receives a well-formed response.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                           Host platform                            │
//! │          (one InvocationContext per function invocation)           │
//! └────────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//!   normalize headers → resolve options → gate loggers → globals
//!                                   │
//!                                   ▼
//!   ┌───────────────┐   ┌───────────────────┐   ┌──────────────────┐
//!   │ preflight ────┼──▶│  caller's routes  │──▶│ caller finalizers│
//!   │ (before[0])   │   │  (fresh router)   │   │ → CORS finalizer │
//!   └───────────────┘   └───────────────────┘   └──────────────────┘
//!                                   │
//!                                   ▼
//!                     response (or 404 / error boundary)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use routegate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = InvocationContext::new(
//!         GateRequest::new(Method::Get, "/widgets"),
//!         Logger::from_fn(|msg| println!("{msg}")),
//!         Logger::from_fn(|msg| eprintln!("{msg}")),
//!     );
//!
//!     let response = handle_request(
//!         context,
//!         |router| {
//!             router.get("/widgets", handler_fn(|invocation: Invocation| async move {
//!                 let body = invocation.res.json(&serde_json::json!({ "items": [] }))?;
//!                 Ok(Flow::Respond(body))
//!             }));
//!         },
//!         Options::new().allow_origin("https://app.example"),
//!     )
//!     .await;
//!
//!     println!("{} {}", response.status.0, response);
//! }
//! ```
//!
//! ## Invocation model
//!
//! Every invocation builds its own router from scratch; no route table or
//! configuration survives between calls. The only process-wide state is the
//! optional logger/env binding, which warm instances share by design.

pub mod cors;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logging;
pub mod options;
pub mod router;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::cors::{build_cors_options, Cors, CorsFinalizer, CorsPolicy, PreflightInterceptor};
    pub use crate::error::GateError;
    pub use crate::gateway::{
        create_router, handle_error, handle_request, run_router, InvocationContext, RequestId,
    };
    pub use crate::http::{
        normalize_headers, GateRequest, GateResponse, Method, ResponseBuilder, StatusCode,
    };
    pub use crate::logging::{gate_loggers, global_error, global_log, install_globals, Logger};
    pub use crate::options::{CorsConfig, FinalOptions, LogMode, LogsSetting, Options, OriginRule};
    pub use crate::router::{
        handler_fn, ErrorHook, Flow, Handler, HandlerFn, Internals, Invocation, Route, RouteMethod,
        Router, RouterOptions,
    };
    pub use async_trait::async_trait;
}

// Re-export for convenience
pub use error::GateError;
pub use gateway::{handle_request, InvocationContext};
pub use http::{GateRequest, GateResponse, ResponseBuilder};
pub use options::{FinalOptions, Options};
pub use router::{Flow, Handler, Invocation, Router};
