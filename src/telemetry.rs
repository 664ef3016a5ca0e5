use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber for a hosting binary.
///
/// Library code only emits `tracing` events; calling this is the host's
/// choice (tests and embedders may install their own subscriber instead).
pub fn init(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
