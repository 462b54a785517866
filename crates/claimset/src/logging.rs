//! Tracing setup for the `claimset` binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `default_level` if unset.
/// Output: stderr, compact format, with thread names so arbiter and
/// agent lines can be told apart.
///
/// # Example
/// ```bash
/// RUST_LOG=claimset_engine=debug claimset --humans 1 --bots 2
/// ```
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .init();
}
