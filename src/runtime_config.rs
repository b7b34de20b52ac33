//! Environment-based tuning for the coroutine runtime.
//!
//! Responder delegates run on `may` coroutines whose stack size is fixed at
//! spawn time. `ROUTEGATE_STACK_SIZE` overrides the default and accepts either
//! decimal (`16384`) or hexadecimal (`0x4000`) values.
//!
//! Memory cost is `stack_size × registered_routes`, so the default stays small
//! (16 KiB); raise it for delegates with deep call chains or large locals.

use std::env;

/// Default coroutine stack size in bytes (16 KiB).
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for responder coroutines in bytes.
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// unset or unparseable values.
    pub fn from_env() -> Self {
        let stack_size = env::var("ROUTEGATE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

fn parse_size(value: &str) -> Option<usize> {
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
