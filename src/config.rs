//! Construction-time configuration for a [`GateService`](crate::server::GateService).
//!
//! The JWT secret is deliberately an explicit dependency threaded through this
//! struct at server construction, never ambient global state.

/// Default maximum accepted request body size in bytes (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1_048_576;

/// Options recognized when constructing a service.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Key material used to verify session tokens (HS256).
    pub jwt_secret: String,
    /// Fallback body-size limit for routes that do not declare their own.
    pub body_limit: usize,
}

impl GateConfig {
    /// Create a configuration with the given token secret and the default
    /// 1 MiB body limit.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Override the default body-size limit.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_one_mib() {
        let config = GateConfig::new("secret");
        assert_eq!(config.body_limit, 1_048_576);
    }

    #[test]
    fn limit_is_overridable() {
        let config = GateConfig::new("secret").body_limit(10);
        assert_eq!(config.body_limit, 10);
    }
}
