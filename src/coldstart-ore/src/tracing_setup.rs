//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Installs a global [`tracing_subscriber`] subscriber.
///
/// `debug` raises the default level from `info` to `debug` for the whole
/// process; either way, `RUST_LOG` (consulted via
/// [`EnvFilter::from_default_env`]) takes precedence per-target, layered
/// under whatever the `--debug`/`DEBUG` flag selects.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
