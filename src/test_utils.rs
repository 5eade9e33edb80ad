//! Helpers shared by unit and integration tests.

use std::fs::File;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `readyprobe=trace` so fallback decisions
/// show up in failing test output.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("readyprobe=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Creates an anonymous pipe as `(read end, write end)`.
///
/// # Panics
///
/// Panics if the pipe cannot be created.
#[must_use]
pub fn pipe_pair() -> (File, File) {
    let (read, write) = nix::unistd::pipe().expect("create pipe");
    (File::from(read), File::from(write))
}
