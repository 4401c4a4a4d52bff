//! Tracing initialization for binaries and tests embedding the crate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with an env-filter default.
///
/// Safe to call once per process; embedding hosts that install their
/// own subscriber should skip this.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipcam=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
