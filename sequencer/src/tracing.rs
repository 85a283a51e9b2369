use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

/// Installs a plain-text subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when it is unset. Does nothing if a subscriber is
/// already installed.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_filter(filter),
        )
        .try_init();
}
