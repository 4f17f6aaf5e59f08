use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// Wrapped in a `Once` so the global subscriber is set exactly one time, even
/// when tests run in parallel. Integration tests call this before driving the
/// engine so `RUST_LOG=tearoff=debug` shows the clone traffic.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}
