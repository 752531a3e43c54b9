//! Logging bootstrap for Strand.
//!
//! Structured logging is controlled by environment variables:
//!
//! - `STRAND_DEBUG=true` (or `1`, `yes`) - Enable debug logging
//! - `STRAND_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `STRAND_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! ```rust,no_run
//! use strand_query::logging;
//!
//! // Call once at startup; later calls are no-ops.
//! logging::init();
//! ```
//!
//! Inside the workspace use the `tracing` macros directly, or the
//! [`strand_debug!`](crate::strand_debug) / [`strand_trace!`](crate::strand_trace)
//! macros for chatty per-operation output that should stay silent unless
//! `STRAND_DEBUG` is set.

use std::env;
use std::sync::{Once, OnceLock};

static INIT: Once = Once::new();
static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if debug logging is enabled via `STRAND_DEBUG`.
///
/// The variable is read once per process.
#[inline]
pub fn is_debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| parse_debug_flag(env::var("STRAND_DEBUG").ok().as_deref()))
}

fn parse_debug_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Get the configured log level from `STRAND_LOG_LEVEL`.
///
/// Defaults to "debug" if `STRAND_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };

    match env::var("STRAND_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `STRAND_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("STRAND_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Build the `EnvFilter` directive string for the Strand crates.
pub fn filter_directive(level: &str) -> String {
    format!(
        "strand_orm={level},strand_query={level},strand_mongodb={level}",
        level = level
    )
}

/// Initialize the Strand logging system.
///
/// Does nothing unless `STRAND_DEBUG` or `STRAND_LOG_LEVEL` is set, so
/// applications that install their own subscriber are left alone.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("STRAND_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directive(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Strand logging initialized"
                );
            }
        }
    });
}

/// Debug-level log that only fires when `STRAND_DEBUG` is enabled.
#[macro_export]
macro_rules! strand_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace-level log that only fires when `STRAND_DEBUG` is enabled.
#[macro_export]
macro_rules! strand_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
