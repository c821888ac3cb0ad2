use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing once for the whole test binary.
///
/// Uses `with_test_writer()`, so log output is captured per-test and only
/// printed for failing tests (unless running with `-- --nocapture`).
/// Raise levels with e.g. `RUST_LOG=procwatch=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}
