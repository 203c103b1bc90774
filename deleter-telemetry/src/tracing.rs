//! Tracing subscriber initialization for binaries and tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TEST_TRACING: Once = Once::new();

/// Initializes the global tracing subscriber for a binary.
///
/// The filter is taken from `RUST_LOG` when set, falling back to the given
/// default directives. Panics if a global subscriber is already installed,
/// so call this exactly once at process start.
pub fn init_tracing(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initializes tracing for tests.
///
/// Safe to call from every test: initialization happens once per process and
/// output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
