//! Logging setup for the CLI.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber, honoring `RUST_LOG` when set.
///
/// Output goes to stderr so exported data on stdout stays clean. Calling it a
/// second time is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,marina_rom=info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
