//! Tracing subscriber setup shared by the server and the accrual worker.

use tracing_subscriber::EnvFilter;

/// Initialize logging. Reads `RUST_LOG`, defaulting to "info".
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
