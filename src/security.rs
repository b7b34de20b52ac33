//! Cookie-based session-token authentication.
//!
//! Routes that declare `authenticate` require a signed token in the `token`
//! cookie. The token is verified (HS256 signature and expiry) against the
//! secret supplied at server construction; the decoded claims are attached to
//! the in-flight request for the responder to use.
//!
//! All verification failures are deliberately indistinguishable on the wire:
//! a missing cookie, a tampered signature, and an expired token each produce
//! the same uniform 403. The cause is logged at debug level server-side only.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Verifies a signed token and produces its claims, or fails.
///
/// The default implementation is [`JwtVerifier`]; swap in another
/// implementation to change the token format without touching the pipeline.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return its decoded claims, or `None` on any failure.
    fn verify(&self, token: &str) -> Option<Value>;
}

/// HS256 JWT verifier over a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for the given secret. Expiry (`exp`) is validated
    /// and required.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Option<Value> {
        match decode::<Value>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                // Never distinguish the cause to the client.
                debug!(error = %err, "Token verification failed");
                None
            }
        }
    }
}

/// Extract the session cookie and verify it, returning the claims.
///
/// `None` covers every failure mode: no cookie, bad signature, expired or
/// malformed token.
pub fn authenticate(
    verifier: &dyn TokenVerifier,
    cookies: &HashMap<String, String>,
) -> Option<Value> {
    let token = cookies.get(TOKEN_COOKIE)?;
    verifier.verify(token)
}
