//! Centralized logging configuration for downstream binaries and tests.
//!
//! Factor evaluation itself only emits structured `warn!` events (projection
//! failures with the offending keys and measurement); this module wires up a
//! consistent subscriber so those events end up somewhere useful.

use tracing::Level;

/// Initialize the tracing subscriber with the library's standard
/// configuration.
///
/// Default log level: INFO, overrideable via the `RUST_LOG` environment
/// variable.
///
/// # Example
/// ```no_run
/// use sfm_factors::init_logger;
///
/// init_logger();
/// tracing::info!("optimization starting");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level.
///
/// # Arguments
/// * `default_level` - The default log level (overrideable via `RUST_LOG`)
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .init();
}
