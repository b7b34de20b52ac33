use crate::dispatcher::{HandlerRequest, HandlerResponse};
use serde_json::Value;
use std::sync::Arc;

/// Response delegate: invoked once per successfully dispatched request.
pub type ResponderFn = Box<dyn Fn(&HandlerRequest) -> HandlerResponse + Send + 'static>;

/// Pre-validation delegate: may mutate the in-flight request, or terminate
/// the request by returning a response of its own.
pub type PrepareFn =
    Arc<dyn Fn(&mut HandlerRequest) -> Option<HandlerResponse> + Send + Sync + 'static>;

/// Static configuration for one `(method, path)` endpoint.
///
/// Optional behaviors are explicit optional fields, checked by presence. A
/// descriptor without a `respond` delegate is considered unregistered and is
/// dropped at table build time.
#[derive(Default)]
pub struct RouteDescriptor {
    /// Delegate invoked on success; required for the route to exist.
    pub respond: Option<ResponderFn>,
    /// Optional delegate invoked before validation.
    pub prepare: Option<PrepareFn>,
    /// Require a verified session token.
    pub authenticate: bool,
    /// Response headers applied unconditionally before body processing.
    pub headers: Vec<(String, String)>,
    /// Force structured-body parsing regardless of method.
    pub json: Option<bool>,
    /// When set, the route opts out of implicit body ingestion.
    pub accept: Option<bool>,
    /// Maximum accepted body size in bytes; the service default applies when
    /// unset.
    pub limit: Option<usize>,
    /// Schema fragment with recognized keys `query`, `headers`, `body`.
    pub validate: Option<Value>,
}

impl RouteDescriptor {
    /// An empty descriptor; chain the builder methods below to fill it in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response delegate.
    #[must_use]
    pub fn respond<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + 'static,
    {
        self.respond = Some(Box::new(f));
        self
    }

    /// Set the pre-validation delegate.
    #[must_use]
    pub fn prepare<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut HandlerRequest) -> Option<HandlerResponse> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(f));
        self
    }

    /// Require authentication for this route.
    #[must_use]
    pub fn authenticate(mut self, required: bool) -> Self {
        self.authenticate = required;
        self
    }

    /// Add a response header applied before body processing.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Control structured-body parsing explicitly.
    #[must_use]
    pub fn json(mut self, parse: bool) -> Self {
        self.json = Some(parse);
        self
    }

    /// Opt out of (or back into) implicit body ingestion.
    #[must_use]
    pub fn accept(mut self, accept: bool) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Cap the accepted body size in bytes.
    #[must_use]
    pub fn limit(mut self, bytes: usize) -> Self {
        self.limit = Some(bytes);
        self
    }

    /// Declare the validation schema fragment.
    #[must_use]
    pub fn validate(mut self, fragment: Value) -> Self {
        self.validate = Some(fragment);
        self
    }
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("respond", &self.respond.is_some())
            .field("prepare", &self.prepare.is_some())
            .field("authenticate", &self.authenticate)
            .field("headers", &self.headers)
            .field("json", &self.json)
            .field("accept", &self.accept)
            .field("limit", &self.limit)
            .field("validate", &self.validate)
            .finish()
    }
}
