use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging. JSON output with span context keeps
/// coordinator diagnostics attributable when several workers talk at
/// once.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("buildswarm telemetry initialized");
    Ok(())
}

/// Shutdown telemetry gracefully.
pub fn shutdown_telemetry() {
    // Structured logging needs no explicit teardown.
    tracing::info!("buildswarm telemetry shutdown complete");
}
