use super::descriptor::{PrepareFn, RouteDescriptor};
use crate::dispatcher::Dispatcher;
use crate::schema::SchemaPredicate;
use anyhow::{anyhow, Context};
use http::Method;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the lookup key for a `(method, path)` pair.
#[must_use]
pub fn endpoint_key(method: &str, path: &str) -> String {
    format!("{method} {path}")
}

/// One resolved entry of the route table.
///
/// The descriptor's delegates have already been split off: `respond` lives in
/// the dispatcher as a coroutine, `prepare` stays here and runs inline.
pub struct RouteEntry {
    /// Method parsed from the endpoint key.
    pub method: Method,
    /// Path component of the endpoint key.
    pub path: String,
    /// Whether a verified session token is required.
    pub authenticate: bool,
    /// Pre-rendered header lines applied before body processing.
    pub header_lines: Vec<&'static str>,
    /// Explicit structured-body flag from the descriptor.
    pub json: Option<bool>,
    /// Body-ingestion opt-out flag from the descriptor.
    pub accept: Option<bool>,
    /// Per-route body-size cap; `None` defers to the service default.
    pub limit: Option<usize>,
    /// Compiled validation predicate, when the route declares one.
    pub validator: Option<SchemaPredicate>,
    /// Optional pre-validation delegate.
    pub prepare: Option<PrepareFn>,
}

impl RouteEntry {
    /// Whether the pipeline ingests a JSON body for this route: either the
    /// route asks for it explicitly (`json`), or it neither opts out
    /// (`accept` unset) nor is a no-body method (GET).
    #[must_use]
    pub fn wants_body(&self) -> bool {
        self.json.unwrap_or(false) || (self.accept.is_none() && self.method != Method::GET)
    }

    /// Effective body-size limit given the service default.
    #[must_use]
    pub fn body_limit(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}

/// Immutable mapping from endpoint key to route entry.
///
/// Built once at startup; cloning shares the underlying map, so every
/// connection's service sees the same read-only table.
#[derive(Clone)]
pub struct RouteTable {
    entries: Arc<HashMap<String, RouteEntry>>,
}

impl RouteTable {
    /// Merge route sources into one table, compile each entry's validation
    /// schema, and register each `respond` delegate with the dispatcher.
    ///
    /// Later sources silently overwrite earlier ones on key collision (logged
    /// at warn, by design). Descriptors without a `respond` delegate are
    /// treated as unregistered and dropped.
    ///
    /// # Errors
    ///
    /// Fails fast on a malformed endpoint key or a validation fragment that
    /// does not compile; neither is ever deferred to request time.
    pub fn build(
        sources: Vec<HashMap<String, RouteDescriptor>>,
        dispatcher: &mut Dispatcher,
    ) -> anyhow::Result<Self> {
        let mut merged: HashMap<String, RouteDescriptor> = HashMap::new();
        for source in sources {
            for (key, descriptor) in source {
                if merged.insert(key.clone(), descriptor).is_some() {
                    warn!(endpoint = %key, "Route overwritten by a later source");
                }
            }
        }

        let mut entries = HashMap::with_capacity(merged.len());
        for (key, descriptor) in merged {
            let Some(respond) = descriptor.respond else {
                debug!(endpoint = %key, "Descriptor has no responder, treated as unregistered");
                continue;
            };

            let (method, path) = split_key(&key)?;
            let validator = descriptor
                .validate
                .as_ref()
                .map(SchemaPredicate::compile)
                .transpose()
                .with_context(|| format!("validation schema for {key}"))?;

            let header_lines = descriptor
                .headers
                .iter()
                .map(|(name, value)| {
                    // Rendered once per route for the process lifetime;
                    // may_minihttp header lines must be 'static.
                    &*Box::leak(format!("{name}: {value}").into_boxed_str())
                })
                .collect();

            // SAFETY: table construction happens during startup, before the
            // server accepts connections, with the may runtime initialized.
            #[allow(unsafe_code)]
            unsafe {
                dispatcher.register_responder(&key, respond);
            }

            entries.insert(
                key,
                RouteEntry {
                    method,
                    path,
                    authenticate: descriptor.authenticate,
                    header_lines,
                    json: descriptor.json,
                    accept: descriptor.accept,
                    limit: descriptor.limit,
                    validator,
                    prepare: descriptor.prepare,
                },
            );
        }

        info!(routes = entries.len(), "Route table built");
        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    /// Look up the entry for an endpoint key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.entries.get(key)
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_key(key: &str) -> anyhow::Result<(Method, String)> {
    let (method, path) = key
        .split_once(' ')
        .ok_or_else(|| anyhow!("malformed endpoint key {key:?}, expected \"<METHOD> <path>\""))?;
    let method =
        Method::from_str(method).with_context(|| format!("endpoint key {key:?} method"))?;
    Ok((method, path.to_string()))
}
