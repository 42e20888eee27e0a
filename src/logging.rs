use std::io::{self, IsTerminal};

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG`, defaulting to `info`. Output is
/// human readable on a terminal and flattened JSON otherwise.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if io::stdout().is_terminal() {
        fmt().with_env_filter(filter).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
    }
}
