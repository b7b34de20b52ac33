//! HTTP glue: request-head parsing, bounded body ingestion, response
//! envelopes, the per-request pipeline service, and the server wrapper.

pub mod body;
pub mod request;
pub mod response;
pub mod service;

mod http_server;

pub use body::{ingest_json_body, BodyError, BoundedReader};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_head, parse_query_params, RequestHead};
pub use service::GateService;
