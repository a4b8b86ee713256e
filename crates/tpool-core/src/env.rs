//! Environment variable utilities
//!
//! All pool tunables can be overridden at process start through `TPOOL_*`
//! variables. These helpers parse a variable with a typed default so a
//! malformed value never aborts pool construction.
//!
//! ```ignore
//! use tpool_core::env::{env_get, env_get_bool};
//!
//! let workers: usize = env_get("TPOOL_NUM_WORKERS", 4);
//! let grace_ms: u64 = env_get("TPOOL_GRACE_PERIOD_MS", 1000);
//! let flush = env_get_bool("TPOOL_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset and unparseable values both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other value is false; an unset variable returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// ============================================================================
// Tests
// ============================================================================
