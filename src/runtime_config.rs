//! # Engine Configuration
//!
//! Configuration knobs for the dispatch engine, with environment-variable
//! overrides.
//!
//! ## Environment Variables
//!
//! ### `FLINT_AFTER_ON_404`
//!
//! Whether after-filters run when no handler matched. The default is
//! `false`: after-filters mirror before-filters around a *successful*
//! handler dispatch, so a 404 skips them. Set to `1`/`true` to run
//! after-filters on 404 responses as well.
//!
//! ### `FLINT_BODY_LIMIT`
//!
//! Maximum number of request-body bytes the engine materializes, in bytes.
//! Accepts decimal (`1048576`) or hexadecimal (`0x100000`). Default: 10 MB.
//! Bytes past the limit are never buffered: the embedded server caps its
//! transport read at the limit, and the engine's lazy body cache stops
//! reading any caller-supplied stream at the same point.

use std::env;

const DEFAULT_BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Engine configuration.
///
/// Load from the environment with [`EngineConfig::from_env()`] or build one
/// directly for tests and embedders that configure programmatically.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Run after-filters when no handler matched (default `false`).
    pub run_after_on_not_found: bool,
    /// Request-body materialization cap in bytes (default 10 MB).
    pub body_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_after_on_not_found: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn parse_size(val: &str) -> Option<u64> {
    if let Some(hex) = val.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let run_after_on_not_found = env::var("FLINT_AFTER_ON_404")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
            .unwrap_or(defaults.run_after_on_not_found);
        let body_limit = env::var("FLINT_BODY_LIMIT")
            .ok()
            .and_then(|v| parse_size(v.trim()))
            .unwrap_or(defaults.body_limit);
        Self {
            run_after_on_not_found,
            body_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // from_env() tests mutate process-wide environment variables and must
    // not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.run_after_on_not_found);
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn test_parse_size_accepts_hex_and_decimal() {
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size("0x400"), Some(1024));
        assert_eq!(parse_size("nope"), None);
    }

    #[test]
    fn test_from_env_applies_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("FLINT_AFTER_ON_404", "true");
        env::set_var("FLINT_BODY_LIMIT", "0x400");
        let config = EngineConfig::from_env();
        env::remove_var("FLINT_AFTER_ON_404");
        env::remove_var("FLINT_BODY_LIMIT");
        assert!(config.run_after_on_not_found);
        assert_eq!(config.body_limit, 1024);
    }

    #[test]
    fn test_from_env_falls_back_on_unset_or_garbage() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::remove_var("FLINT_AFTER_ON_404");
        env::set_var("FLINT_BODY_LIMIT", "not-a-size");
        let config = EngineConfig::from_env();
        env::remove_var("FLINT_BODY_LIMIT");
        assert!(!config.run_after_on_not_found);
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
    }
}
