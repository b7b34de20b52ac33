//! # routegate
//!
//! A minimal coroutine-powered HTTP request-dispatch pipeline for JSON APIs,
//! built on the `may` runtime and `may_minihttp`.
//!
//! Given a collection of route-descriptor maps keyed by `"<METHOD> <path>"`,
//! routegate builds one request service that resolves each incoming request
//! to a route, enforces cookie-based token authentication, bounded body
//! ingestion, and schema validation, then delegates to the route's response
//! handler. It owns only the per-request control flow and its failure modes;
//! route discovery and business logic stay with the caller.
//!
//! ## Architecture
//!
//! - **[`routes`]** - route descriptors and the immutable route table
//! - **[`schema`]** - validation fragments compiled to reusable predicates
//! - **[`dispatcher`]** - coroutine-based responder dispatch
//! - **[`security`]** - signed-token authentication from the `token` cookie
//! - **[`server`]** - request parsing, bounded body ingestion, the staged
//!   pipeline service, and the HTTP server wrapper
//! - **[`config`]** - construction-time options (JWT secret, body limit)
//! - **[`runtime_config`]** - env-based coroutine runtime tuning
//!
//! ## Pipeline
//!
//! Stages run in strict order per request, each a potential terminal exit
//! with a fixed failure message: resolve (404), authenticate (403), headers,
//! body ingest (406/413/400), prepare, validate (400), respond. Anything
//! unexpected is caught once at the outermost boundary and answered with a
//! single 500; detail is logged, never sent to the peer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use routegate::{
//!     Dispatcher, GateConfig, GateService, HandlerResponse, HttpServer, RouteDescriptor,
//!     RouteTable,
//! };
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut routes = HashMap::new();
//! routes.insert(
//!     "GET /hello".to_string(),
//!     RouteDescriptor::new().respond(|_req| HandlerResponse::ok(json!("hi"))),
//! );
//!
//! let mut dispatcher = Dispatcher::new();
//! let table = RouteTable::build(vec![routes], &mut dispatcher)?;
//! let service = GateService::new(table, dispatcher, GateConfig::new("jwt-secret"));
//! let handle = HttpServer(service).start("127.0.0.1:8080")?;
//! handle.join().ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod ids;
pub mod routes;
pub mod runtime_config;
pub mod schema;
pub mod security;
pub mod server;

pub use config::{GateConfig, DEFAULT_BODY_LIMIT};
pub use dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
pub use ids::RequestId;
pub use routes::{endpoint_key, RouteDescriptor, RouteTable};
pub use runtime_config::RuntimeConfig;
pub use schema::SchemaPredicate;
pub use security::{JwtVerifier, TokenVerifier, TOKEN_COOKIE};
pub use server::{GateService, HttpServer, ServerHandle};
