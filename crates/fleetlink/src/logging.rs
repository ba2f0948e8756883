//! Log output for binaries embedding Fleetlink.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set, so tests and hosts
/// with their own logging may call it freely.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
