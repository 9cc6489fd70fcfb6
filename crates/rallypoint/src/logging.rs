//! Logging bootstrap.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.
///
/// Returns `false` if a global subscriber was already installed (tests,
/// or a host application that set up its own).
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
