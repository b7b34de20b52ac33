use crate::ids::RequestId;
use crate::runtime_config::RuntimeConfig;
use anyhow::{anyhow, Context};
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// In-flight request context, one per request.
///
/// Owned exclusively by the request's task for its lifetime: built by the
/// pipeline after route resolution, optionally mutated by the route's
/// `prepare` delegate, then moved to the responder coroutine. Discarded once
/// the response is written.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request id for log correlation.
    pub request_id: RequestId,
    /// HTTP method of the matched route.
    pub method: Method,
    /// Request path (query string stripped).
    pub path: String,
    /// Decoded query-string parameters.
    pub query_params: HashMap<String, String>,
    /// HTTP headers (lowercase names).
    pub headers: HashMap<String, String>,
    /// Cookies parsed from the Cookie header.
    pub cookies: HashMap<String, String>,
    /// Parsed JSON body, when the route ingests one.
    pub body: Option<Value>,
    /// Verified session claims, when the route authenticates.
    pub claims: Option<Value>,
}

impl HandlerRequest {
    /// Get a query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get a header by name (stored lowercase).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Payload produced by a responder (or a terminal `prepare`).
///
/// The server wraps `body` as `{"success": <body>}` on the wire; failure
/// envelopes are produced only by the pipeline itself.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code.
    pub status: u16,
    /// Extra response headers (Content-Type is owned by the wire contract).
    pub headers: HashMap<String, String>,
    /// Success payload.
    pub body: Value,
}

impl HandlerResponse {
    /// A 200 response with the given payload.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// Override the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add or replace a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One dispatch unit: the request context plus its reply channel.
pub struct DispatchJob {
    request: HandlerRequest,
    reply_tx: mpsc::Sender<Result<HandlerResponse, String>>,
}

/// Channel sender feeding one responder coroutine.
pub type ResponderSender = mpsc::Sender<DispatchJob>;

/// Registry of responder coroutines, keyed by endpoint key.
///
/// Cloning shares the underlying channels, so one dispatcher instance can be
/// cloned into every connection's service without re-spawning coroutines.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, ResponderSender>,
}

impl Dispatcher {
    /// Create an empty dispatcher; responders are registered during route
    /// table construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Number of registered responders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no responders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Spawn a coroutine for `responder` and register it under `key`.
    ///
    /// Re-registering a key drops the previous sender, which closes the old
    /// coroutine's channel and lets it exit.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn`, which is unsafe in the `may`
    /// runtime. The caller must ensure the runtime is initialized and that
    /// registration happens during startup, before requests are served.
    pub unsafe fn register_responder<F>(&mut self, key: &str, responder: F)
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<DispatchJob>();
        let key = key.to_string();
        let coroutine_key = key.clone();
        let stack_size = RuntimeConfig::from_env().stack_size;

        let spawn_result = coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                debug!(endpoint = %coroutine_key, stack_size, "Responder coroutine started");
                for job in rx.iter() {
                    let DispatchJob { request, reply_tx } = job;
                    let request_id = request.request_id;
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        responder(&request)
                    }));
                    let reply = match outcome {
                        Ok(response) => Ok(response),
                        Err(panic) => {
                            let message = panic_message(&panic);
                            error!(
                                request_id = %request_id,
                                endpoint = %coroutine_key,
                                panic_message = %message,
                                "Responder panicked"
                            );
                            Err(message)
                        }
                    };
                    // The pipeline may have given up on the request; a closed
                    // reply channel is not an error here.
                    let _ = reply_tx.send(reply);
                }
                debug!(endpoint = %coroutine_key, "Responder coroutine exited");
            });

        match spawn_result {
            Ok(_) => {
                if self.handlers.insert(key.clone(), tx).is_some() {
                    debug!(endpoint = %key, "Replaced existing responder");
                } else {
                    info!(endpoint = %key, total = self.handlers.len(), "Responder registered");
                }
            }
            Err(err) => {
                error!(endpoint = %key, error = %err, "Failed to spawn responder coroutine");
            }
        }
    }

    /// Send the request to its responder coroutine and wait for the reply.
    ///
    /// # Errors
    ///
    /// Fails when no responder is registered for `key`, when the responder
    /// coroutine is gone, or when the responder panicked. All of these are
    /// internal conditions the pipeline answers with a 500.
    pub fn dispatch(&self, key: &str, request: HandlerRequest) -> anyhow::Result<HandlerResponse> {
        let tx = self
            .handlers
            .get(key)
            .ok_or_else(|| anyhow!("no responder registered for {key}"))?;

        let request_id = request.request_id;
        let (reply_tx, reply_rx) = mpsc::channel();
        tx.send(DispatchJob { request, reply_tx })
            .map_err(|_| anyhow!("responder coroutine for {key} is gone"))?;

        let reply = reply_rx
            .recv()
            .with_context(|| format!("responder for {key} dropped the reply channel"))?;
        reply.map_err(|panic| anyhow!("responder for {key} panicked: {panic}"))
            .inspect(|response| {
                debug!(request_id = %request_id, status = response.status, "Responder replied");
            })
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
