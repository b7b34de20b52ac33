//! Schema compilation for route validation.
//!
//! Each route may declare a `validate` fragment with the recognized top-level
//! keys `query`, `headers`, and `body`, each a JSON Schema for that sub-object
//! of the request. The fragment is compiled once at table build into a
//! [`SchemaPredicate`] and reused for the lifetime of the process; malformed
//! fragments abort startup instead of surfacing per request.

use anyhow::anyhow;
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Fragment keys the compiler recognizes; anything else is ignored.
const RECOGNIZED_KEYS: [&str; 3] = ["query", "headers", "body"];

/// A compiled, shareable predicate over a `{query, headers, body}` object.
///
/// Cheap to clone; the underlying compiled schema is reference counted and
/// read-only, so predicates are safely shared across concurrent requests.
#[derive(Clone)]
pub struct SchemaPredicate {
    compiled: Arc<JSONSchema>,
}

impl SchemaPredicate {
    /// Compile a route's `validate` fragment into a reusable predicate.
    ///
    /// The recognized keys become named properties of one combined object
    /// schema, so a fragment like `{"body": {...}}` validates the request's
    /// body sub-object while leaving query and headers unconstrained.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined schema fails to compile.
    pub fn compile(fragment: &Value) -> anyhow::Result<Self> {
        let combined = combine_fragment(fragment);
        let compiled = JSONSchema::compile(&combined)
            .map_err(|e| anyhow!("invalid validation schema: {e}"))?;
        debug!(
            keys = ?fragment.as_object().map(|o| o.keys().collect::<Vec<_>>()),
            "Validation schema compiled"
        );
        Ok(Self {
            compiled: Arc::new(compiled),
        })
    }

    /// Test whether the given `{query, headers, body}` instance satisfies the
    /// route's declared schema.
    #[must_use]
    pub fn accepts(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}

impl std::fmt::Debug for SchemaPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaPredicate").finish_non_exhaustive()
    }
}

/// Lift the recognized fragment keys into one combined object schema.
fn combine_fragment(fragment: &Value) -> Value {
    let mut properties = serde_json::Map::new();
    if let Some(object) = fragment.as_object() {
        for key in RECOGNIZED_KEYS {
            if let Some(sub) = object.get(key) {
                properties.insert(key.to_string(), sub.clone());
            }
        }
    }
    json!({ "type": "object", "properties": properties })
}
