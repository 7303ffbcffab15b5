//! Console logging setup shared by the monitor and gating binaries.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber once per process.
///
/// Log level comes from `RUST_LOG`, defaulting to `info`. These binaries are
/// short-lived cron jobs, so a console layer is the whole story; file
/// rotation belongs to whatever supervises them.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber =
            tracing_subscriber::registry().with(fmt::layer().with_target(true).with_filter(filter));

        // try_init so tests that install their own subscriber don't panic
        if subscriber.try_init().is_err() {
            tracing::debug!("tracing subscriber already installed, keeping it");
        }
    });
}
