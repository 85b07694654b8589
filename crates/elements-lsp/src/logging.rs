//! `tracing` subscriber setup.
//!
//! Logs go to stderr; stdout carries the protocol stream.

use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives. Takes precedence over configuration.
pub const LOG_ENV: &str = "ELEMENTS_LOG";

/// Filter used when neither the environment nor the configuration provides one.
pub const DEFAULT_FILTER: &str = "elements_lsp=info,elements_treesitter=info";

/// Resolve the active filter: `ELEMENTS_LOG`, then `configured`, then [`DEFAULT_FILTER`].
///
/// Invalid directives fall back to the next source.
pub fn resolve_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| match configured {
            Some(directives) => EnvFilter::try_new(directives),
            None => EnvFilter::try_new(DEFAULT_FILTER),
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global fmt subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(configured: Option<&str>) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(configured))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .is_ok()
}
