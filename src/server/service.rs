use super::body::{ingest_json_body, BodyError};
use super::request::parse_head;
use super::response::{
    write_failure, write_success, MSG_FORBIDDEN, MSG_INTERNAL, MSG_INVALID, MSG_NOT_FOUND,
    MSG_NOT_JSON, MSG_PARSE, MSG_TOO_LARGE,
};
use crate::config::GateConfig;
use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::ids::RequestId;
use crate::routes::{endpoint_key, RouteTable};
use crate::security::{authenticate, JwtVerifier, TokenVerifier};
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Terminal outcome of the pipeline for one request.
///
/// Every stage returns through this value; the service writes it to the wire
/// exactly once, which is what guarantees a single terminal response per
/// request.
enum Reply {
    /// A responder (or terminal `prepare`) produced the reply.
    Respond(HandlerResponse),
    /// A pipeline stage short-circuited with a fixed failure.
    Failure(u16, &'static str),
}

/// The per-request dispatch pipeline over a route table.
///
/// Stages run in strict order, each a potential terminal exit: resolve,
/// authenticate, headers, body ingest, prepare, validate, respond. Cloned
/// per connection by the server; all shared state is read-only.
#[derive(Clone)]
pub struct GateService {
    table: RouteTable,
    dispatcher: Dispatcher,
    config: Arc<GateConfig>,
    verifier: Arc<dyn TokenVerifier>,
}

impl GateService {
    /// Assemble a service from a built route table, the dispatcher holding
    /// its responders, and construction-time configuration. Token
    /// verification uses HS256 over `config.jwt_secret`.
    #[must_use]
    pub fn new(table: RouteTable, dispatcher: Dispatcher, config: GateConfig) -> Self {
        let verifier = Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes()));
        Self {
            table,
            dispatcher,
            config: Arc::new(config),
            verifier,
        }
    }

    /// Replace the token verifier (e.g. for a different token format).
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Run the staged pipeline for one request.
    ///
    /// Writes nothing to the wire itself; header side effects excepted, the
    /// outcome travels back as a [`Reply`]. Unexpected failures (transport
    /// errors, responder panics) come back as `Err` for the caller to map to
    /// a single 500.
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<Reply> {
        let request_id = RequestId::new();
        let head = parse_head(&req);
        let key = endpoint_key(&head.method, &head.path);

        // Resolve. Entries always carry a responder; a descriptor without
        // one was dropped at build time.
        let Some(entry) = self.table.get(&key) else {
            debug!(request_id = %request_id, endpoint = %key, "No route registered");
            return Ok(Reply::Failure(404, MSG_NOT_FOUND));
        };

        // Authenticate.
        let claims = if entry.authenticate {
            match authenticate(self.verifier.as_ref(), &head.cookies) {
                Some(claims) => Some(claims),
                None => {
                    debug!(request_id = %request_id, endpoint = %key, "Authentication failed");
                    return Ok(Reply::Failure(403, MSG_FORBIDDEN));
                }
            }
        } else {
            None
        };

        // Headers: applied unconditionally before body processing, so they
        // also appear on any later failure reply.
        for &line in &entry.header_lines {
            res.header(line);
        }

        // Body ingest, bounded by the route's effective limit.
        let body = if entry.wants_body() {
            let limit = entry.body_limit(self.config.body_limit);
            match ingest_json_body(req.body(), &head.headers, limit) {
                Ok(parsed) => parsed,
                Err(BodyError::UnsupportedMediaType) => {
                    return Ok(Reply::Failure(406, MSG_NOT_JSON))
                }
                Err(BodyError::TooLarge) => return Ok(Reply::Failure(413, MSG_TOO_LARGE)),
                Err(BodyError::Malformed) => return Ok(Reply::Failure(400, MSG_PARSE)),
                Err(BodyError::Io(err)) => return Err(err.into()),
            }
        } else {
            None
        };

        let mut ctx = HandlerRequest {
            request_id,
            method: entry.method.clone(),
            path: head.path,
            query_params: head.query_params,
            headers: head.headers,
            cookies: head.cookies,
            body,
            claims,
        };

        // Prepare: may mutate the context or terminate the request itself.
        if let Some(prepare) = &entry.prepare {
            if let Some(reply) = prepare(&mut ctx) {
                debug!(request_id = %request_id, endpoint = %key, "Prepare delegate terminated the request");
                return Ok(Reply::Respond(reply));
            }
        }

        // Validate the combined {query, headers, body} instance.
        if let Some(validator) = &entry.validator {
            let mut instance = json!({
                "query": &ctx.query_params,
                "headers": &ctx.headers,
            });
            if let Some(body) = &ctx.body {
                instance["body"] = body.clone();
            }
            if !validator.accepts(&instance) {
                debug!(request_id = %request_id, endpoint = %key, "Schema validation rejected the request");
                return Ok(Reply::Failure(400, MSG_INVALID));
            }
        }

        // Respond.
        let reply = self.dispatcher.dispatch(&key, ctx)?;
        info!(
            request_id = %request_id,
            endpoint = %key,
            status = reply.status,
            "Request completed"
        );
        Ok(Reply::Respond(reply))
    }
}

impl HttpService for GateService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        // Outermost boundary: genuinely unexpected failures become one 500
        // with a fixed message; detail stays in the server log, never on the
        // wire.
        let reply = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle(req, res)
        })) {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                error!(error = %err, "Request pipeline failed");
                Reply::Failure(500, MSG_INTERNAL)
            }
            Err(panic) => {
                error!(panic = ?panic.downcast_ref::<&str>(), "Request pipeline panicked");
                Reply::Failure(500, MSG_INTERNAL)
            }
        };

        match reply {
            Reply::Respond(handler_reply) => write_success(res, handler_reply),
            Reply::Failure(status, message) => write_failure(res, status, message),
        }
        Ok(())
    }
}
