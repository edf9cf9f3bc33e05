//! Test support shared by the trove crates.

use std::sync::Once;

pub use trove_testhelpers_macros::test;

static INIT: Once = Once::new();

/// Install a tracing subscriber that writes through the test harness.
///
/// Filtering follows `RUST_LOG`; without it only warnings are shown.
/// The [`test`] attribute calls this first thing in every test.
pub fn setup() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
        tracing::debug!("test tracing initialized");
    });
}

/// Strip ANSI color codes from rendered diagnostics.
pub fn strip_ansi(rendered: &str) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(rendered)).into_owned()
}
