//! Shared logging utilities for consistent tracing across the proxy

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Pick the base level: explicit level wins, then `--debug`, then `--verbose`, else warn
pub fn resolve_level<'a>(explicit: Option<&'a str>, debug: bool, verbose: bool) -> &'a str {
    match explicit {
        Some(level) => level,
        None if debug => "debug",
        None if verbose => "info",
        None => "warn",
    }
}

/// Filter directives for our crates at the given base level
pub fn filter_directives(base_level: &str) -> String {
    format!("mockproxy={base_level},shared={base_level},tower_http=warn,hyper=warn,reqwest=warn")
}

/// Initialize the stdout tracing subscriber
///
/// `RUST_LOG` takes precedence over the computed directives when it is set.
pub fn init_tracing(base_level: &str, colors: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    // try_init so tests and embedders that already installed a subscriber keep theirs
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_ansi(colors)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for request-scoped info logging
#[macro_export]
macro_rules! request_info {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::info!(
            request = %$request_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for request-scoped warning logging
#[macro_export]
macro_rules! request_warn {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            request = %$request_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for request-scoped debug logging
#[macro_export]
macro_rules! request_debug {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            request = %$request_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(details: &str) {
    info!(timestamp = format_timestamp(), "🚀 Starting {}", details);
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(reason: &str) {
    info!(timestamp = format_timestamp(), "🔻 Shutting down: {}", reason);
}

/// Contextual logging helper for error conditions
pub fn log_error(context: &str, error: &dyn std::fmt::Display) {
    error!(
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(message: &str) {
    info!(timestamp = format_timestamp(), "✅ {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        assert_eq!(resolve_level(None, false, false), "warn");
        assert_eq!(resolve_level(None, false, true), "info");
        assert_eq!(resolve_level(None, true, true), "debug");
        assert_eq!(resolve_level(Some("trace"), true, false), "trace");
    }

    #[test]
    fn test_filter_directives() {
        let directives = filter_directives("debug");
        assert!(directives.starts_with("mockproxy=debug,shared=debug"));
        assert!(directives.contains("reqwest=warn"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = format_timestamp();
        // HH:MM:SS.mmm
        assert_eq!(ts.len(), 12);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[8..9], ".");
    }
}
