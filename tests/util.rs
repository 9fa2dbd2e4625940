#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

/// Installs a global subscriber for this test binary, if one isn't already
/// installed. `RUST_LOG` overrides the default filter.
pub fn trace_init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hyphae=debug,info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .with_thread_names(true)
        .try_init();
}
