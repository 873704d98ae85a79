//! Logging setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. Reads `RUST_LOG` (defaults to "info").
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
