//! Logging configuration and initialization
//!
//! This module sets up the tracing subscriber for structured logging
//! throughout the application.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve the effective level for a configured level string
///
/// `verbose` always wins and selects `debug`. Otherwise the first word of
/// `log_level` is used, with `warning` mapped to `warn` and `critical` to
/// `error`. Unknown values fall back to `info`.
pub fn resolve_level(log_level: &str, verbose: bool) -> &'static str {
    if verbose {
        return "debug";
    }

    // Extract just the first word to handle trailing comments
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or("info")
        .to_lowercase();

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize the logging system with the specified level
///
/// `RUST_LOG` takes precedence when set.
pub fn init_logging(log_level: &str, verbose: bool) {
    let final_level = resolve_level(log_level, verbose);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(final_level));

    // A second init (e.g. from tests) is not an error worth surfacing
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(resolve_level("error", true), "debug");
    }

    #[test]
    fn test_level_aliases() {
        assert_eq!(resolve_level("WARNING", false), "warn");
        assert_eq!(resolve_level("critical", false), "error");
        assert_eq!(resolve_level("info # default", false), "info");
    }

    #[test]
    fn test_unknown_level_defaults_to_info() {
        assert_eq!(resolve_level("loud", false), "info");
        assert_eq!(resolve_level("", false), "info");
    }
}
